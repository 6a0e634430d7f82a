//! Server-rendered HTML pages
//!
//! Pages are plain `format!` strings. Every value that came from a user or
//! from GitHub goes through `html_escape` before it is interpolated.

use axum::http::StatusCode;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use super::flash::FlashMessage;
use crate::data::User;
use crate::github::Repository;
use crate::service::{DirectoryListing, EditableFile, Page, parent_dir};

const STYLE: &str = r#"
body { font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", sans-serif; max-width: 960px; margin: 0 auto; padding: 0 1rem 2rem; color: #1f2328; }
header { display: flex; justify-content: space-between; align-items: center; border-bottom: 1px solid #d0d7de; margin-bottom: 1rem; }
header a { margin-left: 1rem; }
a { color: #0969da; text-decoration: none; }
a:hover { text-decoration: underline; }
.flash { padding: .6rem .9rem; border-radius: 6px; margin: .4rem 0; }
.flash-success { background: #dafbe1; }
.flash-error { background: #ffebe9; }
.flash-warning { background: #fff8c5; }
.flash-info { background: #ddf4ff; }
table { width: 100%; border-collapse: collapse; }
td, th { text-align: left; padding: .35rem .5rem; border-bottom: 1px solid #d0d7de; }
form.inline { display: inline; }
textarea { width: 100%; min-height: 24rem; font-family: ui-monospace, monospace; }
input[type=text] { min-width: 18rem; }
.muted { color: #656d76; }
nav.pages a, nav.pages span { margin-right: .6rem; }
"#;

/// Wrap `body` in the shared page chrome
fn layout(title: &str, user: Option<&User>, flashes: &[FlashMessage], body: &str) -> String {
    let account = match user {
        Some(user) => format!(
            r#"<span>Signed in as <strong>{}</strong></span><a href="/dashboard">Dashboard</a><a href="/logout">Log out</a>"#,
            text(&user.username)
        ),
        None => String::new(),
    };

    let flashes: String = flashes
        .iter()
        .map(|flash| {
            format!(
                r#"<div class="flash flash-{}">{}</div>"#,
                flash.category.as_str(),
                text(&flash.message)
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} - Repodesk</title>
<style>{STYLE}</style>
</head>
<body>
<header><h1><a href="/">Repodesk</a></h1><div>{account}</div></header>
{flashes}
<main>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
    )
}

/// Landing page: the register/login form, or next steps when logged in
pub fn index(user: Option<&User>, flashes: &[FlashMessage]) -> String {
    let body = match user {
        Some(user) if user.github_token().is_some() => r#"<h2>Welcome back</h2>
<p>Your GitHub account is connected.</p>
<p><a href="/dashboard">Go to your repositories</a></p>"#
            .to_string(),
        Some(_) => r#"<h2>Welcome</h2>
<p>Connect your GitHub account to manage your repositories.</p>
<p><a href="/github/login">Connect GitHub</a></p>"#
            .to_string(),
        None => r#"<h2>Welcome</h2>
<p>Register or log in, then connect your GitHub account to manage your repositories.</p>
<form method="post" action="/auth">
  <p><label>Username <input type="text" name="username" required maxlength="150" autofocus></label></p>
  <p><label>Password <input type="password" name="password"></label></p>
  <p>
    <button type="submit" name="action" value="login">Log in</button>
    <button type="submit" name="action" value="register">Register</button>
  </p>
</form>"#
            .to_string(),
    };

    layout("Welcome", user, flashes, &body)
}

fn dashboard_url(page: usize, query: &str) -> String {
    if query.is_empty() {
        format!("/dashboard?page={}", page)
    } else {
        format!("/dashboard?page={}&q={}", page, urlencoding::encode(query))
    }
}

/// `/repo/{owner}/{name}` with an optional `path`
pub fn repo_url(owner: &str, name: &str, path: &str) -> String {
    let base = format!(
        "/repo/{}/{}",
        urlencoding::encode(owner),
        urlencoding::encode(name)
    );
    if path.is_empty() {
        base
    } else {
        format!("{}?path={}", base, urlencoding::encode(path))
    }
}

/// File form for `path`
pub fn file_url(owner: &str, name: &str, path: &str) -> String {
    format!(
        "/repo/{}/{}/file?path={}",
        urlencoding::encode(owner),
        urlencoding::encode(name),
        urlencoding::encode(path)
    )
}

/// Paginated repository list with the create form and search box
pub fn dashboard(
    user: &User,
    page: &Page<Repository>,
    query: &str,
    flashes: &[FlashMessage],
) -> String {
    let rows: String = page
        .items
        .iter()
        .map(|repo| {
            format!(
                r#"<tr><td><a href="{href}">{full_name}</a>{private}</td><td class="muted">{description}</td></tr>"#,
                href = attr(&repo_url(&repo.owner.login, &repo.name, "")),
                full_name = text(&repo.full_name),
                private = if repo.private { " <small>(private)</small>" } else { "" },
                description = text(repo.description.as_deref().unwrap_or("")),
            )
        })
        .collect();

    let table = if page.items.is_empty() {
        r#"<p class="muted">No repositories on this page.</p>"#.to_string()
    } else {
        format!(
            "<table><thead><tr><th>Repository</th><th>Description</th></tr></thead><tbody>{}</tbody></table>",
            rows
        )
    };

    let mut nav = String::from(r#"<nav class="pages">"#);
    if page.has_prev() {
        let prev = page.page.min(page.total_pages() + 1) - 1;
        nav.push_str(&format!(
            r#"<a href="{}">&laquo; Previous</a>"#,
            attr(&dashboard_url(prev.max(1), query))
        ));
    }
    nav.push_str(&format!(
        "<span>Page {} of {} ({} repositories)</span>",
        page.page,
        page.total_pages(),
        page.total
    ));
    if page.has_next() {
        nav.push_str(&format!(
            r#"<a href="{}">Next &raquo;</a>"#,
            attr(&dashboard_url(page.page + 1, query))
        ));
    }
    nav.push_str("</nav>");

    let body = format!(
        r#"<h2>Your repositories</h2>
<form method="get" action="/dashboard">
  <input type="text" id="repo-search" name="q" value="{query}" list="repo-suggestions" placeholder="Filter by name" autocomplete="off">
  <datalist id="repo-suggestions"></datalist>
  <button type="submit">Search</button>
</form>
{table}
{nav}
<h3>Create a repository</h3>
<form method="post" action="/dashboard">
  <p><label>Name <input type="text" name="repo_name" required></label></p>
  <p><label>Description <input type="text" name="description"></label></p>
  <p><label><input type="checkbox" name="private" value="on"> Private</label></p>
  <p><button type="submit">Create</button></p>
</form>
<script>
(function () {{
  const input = document.getElementById("repo-search");
  const list = document.getElementById("repo-suggestions");
  let timer;
  input.addEventListener("input", function () {{
    clearTimeout(timer);
    timer = setTimeout(async function () {{
      const q = input.value.trim();
      if (!q) {{ list.innerHTML = ""; return; }}
      const response = await fetch("/search_repos?q=" + encodeURIComponent(q));
      if (!response.ok) return;
      const repos = await response.json();
      list.innerHTML = "";
      for (const repo of repos) {{
        const option = document.createElement("option");
        option.value = repo.name;
        list.appendChild(option);
      }}
    }}, 250);
  }});
}})();
</script>"#,
        query = attr(query),
    );

    layout("Dashboard", Some(user), flashes, &body)
}

/// Directory listing with per-file edit and delete controls
pub fn repo(
    user: &User,
    owner: &str,
    name: &str,
    listing: &DirectoryListing,
    flashes: &[FlashMessage],
) -> String {
    let mut crumbs = format!(
        r#"<a href="{}">{}</a>"#,
        attr(&repo_url(owner, name, "")),
        text(&listing.repository.full_name)
    );
    let mut prefix = String::new();
    for segment in listing.path.split('/').filter(|s| !s.is_empty()) {
        if !prefix.is_empty() {
            prefix.push('/');
        }
        prefix.push_str(segment);
        crumbs.push_str(&format!(
            r#" / <a href="{}">{}</a>"#,
            attr(&repo_url(owner, name, &prefix)),
            text(segment)
        ));
    }

    let mut rows = String::new();
    if !listing.path.is_empty() {
        rows.push_str(&format!(
            r#"<tr><td><a href="{}">..</a></td><td></td><td></td></tr>"#,
            attr(&repo_url(owner, name, parent_dir(&listing.path)))
        ));
    }
    for entry in &listing.entries {
        if entry.is_dir() {
            rows.push_str(&format!(
                r#"<tr><td><a href="{}">{}/</a></td><td class="muted">dir</td><td></td></tr>"#,
                attr(&repo_url(owner, name, &entry.path)),
                text(&entry.name)
            ));
        } else {
            rows.push_str(&format!(
                r#"<tr><td><a href="{edit}">{file}</a></td><td class="muted">{size} B</td><td>
<form class="inline" method="post" action="{delete}" onsubmit="return confirm('Delete this file?');">
<input type="hidden" name="file_path" value="{path}">
<input type="text" name="commit_message" placeholder="Delete {path}">
<button type="submit">Delete</button>
</form></td></tr>"#,
                edit = attr(&file_url(owner, name, &entry.path)),
                file = text(&entry.name),
                size = entry.size,
                delete = attr(&format!(
                    "/repo/{}/{}/delete_file",
                    urlencoding::encode(owner),
                    urlencoding::encode(name)
                )),
                path = attr(&entry.path),
            ));
        }
    }

    let new_file = format!(
        "/repo/{}/{}/file?dir={}",
        urlencoding::encode(owner),
        urlencoding::encode(name),
        urlencoding::encode(&listing.path)
    );

    let body = format!(
        r#"<h2>{crumbs}</h2>
<p><a href="{new_file}">New file</a> &middot; <a href="{github}">View on GitHub</a></p>
<table><thead><tr><th>Name</th><th>Size</th><th></th></tr></thead><tbody>{rows}</tbody></table>"#,
        new_file = attr(&new_file),
        github = attr(&listing.repository.html_url),
    );

    layout(&listing.repository.full_name, Some(user), flashes, &body)
}

/// Create or edit form for one file
///
/// `file` is the loaded file when editing; `dir` prefills the path of a new
/// file.
pub fn file_form(
    user: &User,
    owner: &str,
    name: &str,
    file: Option<&EditableFile>,
    dir: &str,
    flashes: &[FlashMessage],
) -> String {
    let (action, heading, path, content) = match file {
        Some(file) => ("edit", "Edit file", file.path.clone(), file.text.as_str()),
        None => {
            let path = if dir.is_empty() {
                String::new()
            } else {
                format!("{}/", dir)
            };
            ("create", "New file", path, "")
        }
    };

    let path_input = if file.is_some() {
        format!(
            r#"<input type="text" name="file_path" value="{}" readonly>"#,
            attr(&path)
        )
    } else {
        format!(
            r#"<input type="text" name="file_path" value="{}" required placeholder="docs/notes.md">"#,
            attr(&path)
        )
    };

    let body = format!(
        r#"<h2>{heading} in <a href="{back}">{owner}/{name}</a></h2>
<form method="post" action="{post}">
  <input type="hidden" name="action" value="{action}">
  <p><label>Path {path_input}</label></p>
  <p><textarea name="file_content">{content}</textarea></p>
  <p><label>Commit message <input type="text" name="commit_message"></label></p>
  <p><button type="submit">Commit</button></p>
</form>"#,
        back = attr(&repo_url(owner, name, parent_dir(&path))),
        owner = text(owner),
        name = text(name),
        post = attr(&format!(
            "/repo/{}/{}/file",
            urlencoding::encode(owner),
            urlencoding::encode(name)
        )),
        content = text(content),
    );

    layout(heading, Some(user), flashes, &body)
}

/// Minimal page for errors that reach the client directly
pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        r#"<h2>{} {}</h2><p>{}</p><p><a href="/">Back to start</a></p>"#,
        status.as_u16(),
        text(status.canonical_reason().unwrap_or("Error")),
        text(message)
    );
    layout("Error", None, &[], &body)
}
