//! Server-rendered HTML. Every dynamic value passes through [`escape`].

pub mod accounts;
pub mod contacts;
pub mod groups;
pub mod sms;
pub mod transfer;

use std::fmt::Write;

use axum::response::Html;
use sph_core::FieldErrors;
use sph_db::{ContactGroup, FlashMessage};

/// Per-request page chrome: who is logged in and the pending flashes.
#[derive(Debug, Clone, Default)]
pub struct Page {
    username: Option<String>,
    flashes: Vec<FlashMessage>,
}

impl Page {
    pub fn user(username: &str, flashes: Vec<FlashMessage>) -> Self {
        Self {
            username: Some(username.to_string()),
            flashes,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn format_timestamp(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn layout(page: &Page, title: &str, body: &str) -> Html<String> {
    let nav = match &page.username {
        Some(username) => format!(
            r#"<nav>
  <a href="/contacts">Contacts</a>
  <a href="/groups">Groups</a>
  <a href="/messages">Messages</a>
  <a href="/contacts/upload">Upload</a>
  <a href="/contacts/export">Export CSV</a>
  <form class="search" method="get" action="/contacts/search"><input type="search" name="q" placeholder="Search contacts"></form>
  <span class="user"><a href="/profile">{}</a></span>
  <form class="logout" method="post" action="/logout"><button type="submit">Log out</button></form>
</nav>"#,
            escape(username)
        ),
        None => r#"<nav><a href="/login">Log in</a> <a href="/signup">Sign up</a></nav>"#.to_string(),
    };

    let mut flashes = String::new();
    for flash in &page.flashes {
        let _ = write!(
            flashes,
            r#"<div class="flash flash-{}">{}</div>"#,
            flash.level.as_str(),
            escape(&flash.message)
        );
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - SPH</title>
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; color: #222; }}
        nav {{ display: flex; gap: 16px; align-items: center; padding: 12px 24px; background: #16213e; }}
        nav a {{ color: #fff; text-decoration: none; }}
        nav .user {{ margin-left: auto; }}
        nav form {{ margin: 0; }}
        main {{ max-width: 960px; margin: 24px auto; padding: 0 16px; }}
        table {{ border-collapse: collapse; width: 100%; }}
        th, td {{ text-align: left; padding: 6px 8px; border-bottom: 1px solid #ddd; }}
        .flash {{ padding: 10px 14px; margin-bottom: 12px; border-radius: 4px; }}
        .flash-success {{ background: #e3f7e8; }}
        .flash-error {{ background: #fde8e8; }}
        .flash-info {{ background: #e8f0fd; }}
        .errorlist {{ color: #b3261e; margin: 4px 0; padding-left: 18px; }}
        .field {{ margin-bottom: 12px; }}
        .field label {{ display: block; font-weight: 600; }}
    </style>
</head>
<body>
{nav}
<main>
{flashes}<h1>{title}</h1>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
    ))
}

pub fn error_page(title: &str, message: &str) -> Html<String> {
    layout(
        &Page::anonymous(),
        title,
        &format!("<p>{}</p>", escape(message)),
    )
}

pub fn error_list(messages: &[String]) -> String {
    if messages.is_empty() {
        return String::new();
    }
    let items: String = messages
        .iter()
        .map(|m| format!("<li>{}</li>", escape(m)))
        .collect();
    format!(r#"<ul class="errorlist">{items}</ul>"#)
}

pub fn non_field_errors(errors: &FieldErrors) -> String {
    error_list(errors.get(FieldErrors::NON_FIELD))
}

pub fn input(kind: &str, name: &str, label: &str, value: &str, errors: &FieldErrors) -> String {
    let value = if kind == "password" { "" } else { value };
    format!(
        r#"<div class="field"><label for="id_{name}">{label}</label>{errs}<input type="{kind}" name="{name}" id="id_{name}" value="{value}"></div>"#,
        label = escape(label),
        errs = error_list(errors.get(name)),
        value = escape(value),
    )
}

pub fn textarea(name: &str, label: &str, value: &str, errors: &FieldErrors) -> String {
    format!(
        r#"<div class="field"><label for="id_{name}">{label}</label>{errs}<textarea name="{name}" id="id_{name}" rows="5">{value}</textarea></div>"#,
        label = escape(label),
        errs = error_list(errors.get(name)),
        value = escape(value),
    )
}

/// `<select>` over the user's groups; `selected` is the submitted raw id.
pub fn group_options(groups: &[ContactGroup], selected: &str) -> String {
    let mut options = String::from(r#"<option value="">---------</option>"#);
    for group in groups {
        let id = group.id.to_string();
        let mark = if id == selected.trim() { " selected" } else { "" };
        let _ = write!(
            options,
            r#"<option value="{id}"{mark}>{}</option>"#,
            escape(&group.name)
        );
    }
    options
}

pub fn group_select(
    name: &str,
    label: &str,
    groups: &[ContactGroup],
    selected: &str,
    errors: &FieldErrors,
) -> String {
    format!(
        r#"<div class="field"><label for="id_{name}">{label}</label>{errs}<select name="{name}" id="id_{name}">{options}</select></div>"#,
        label = escape(label),
        errs = error_list(errors.get(name)),
        options = group_options(groups, selected),
    )
}

pub fn group_name(groups: &[ContactGroup], id: i64) -> &str {
    groups
        .iter()
        .find(|g| g.id == id)
        .map_or("", |g| g.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<script>alert("x & 'y'")</script>"#),
            "&lt;script&gt;alert(&quot;x &amp; &#x27;y&#x27;&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_password_inputs_never_echo() {
        let html = input("password", "password1", "Password", "hunter22", &FieldErrors::new());
        assert!(!html.contains("hunter22"));
    }

    #[test]
    fn test_layout_shows_flashes_escaped() {
        let page = Page::user(
            "jane",
            vec![FlashMessage {
                level: sph_db::FlashLevel::Error,
                message: "<b>bad</b>".into(),
            }],
        );
        let Html(html) = layout(&page, "Contacts", "");
        assert!(html.contains(r#"<div class="flash flash-error">&lt;b&gt;bad&lt;/b&gt;</div>"#));
        assert!(html.contains("<title>Contacts - SPH</title>"));
    }

    #[test]
    fn test_group_options_marks_selection() {
        let groups = vec![
            ContactGroup { id: 1, user_id: 1, name: "Parents".into(), created_at: 0 },
            ContactGroup { id: 2, user_id: 1, name: "Staff & Co".into(), created_at: 0 },
        ];
        let html = group_options(&groups, "2");
        assert!(html.contains(r#"<option value="2" selected>Staff &amp; Co</option>"#));
        assert!(html.contains(r#"<option value="1">Parents</option>"#));
    }
}
