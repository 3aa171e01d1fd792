use std::fmt::Write;

use axum::response::Html;
use sph_core::{FieldErrors, GroupForm};
use sph_db::ContactGroup;

use super::{Page, escape, format_timestamp, input, layout, non_field_errors};

pub fn list(page: &Page, groups: &[ContactGroup]) -> Html<String> {
    let mut rows = String::new();
    for group in groups {
        let _ = write!(
            rows,
            r#"<tr><td>{name}</td><td>{created}</td><td><a href="/groups/{id}/edit">Edit</a> <a href="/groups/{id}/delete">Delete</a></td></tr>"#,
            name = escape(&group.name),
            created = format_timestamp(group.created_at),
            id = group.id,
        );
    }
    let table = if groups.is_empty() {
        "<p>No groups yet.</p>".to_string()
    } else {
        format!(
            "<table><thead><tr><th>Name</th><th>Created</th><th></th></tr></thead><tbody>{rows}</tbody></table>"
        )
    };
    layout(
        page,
        "Groups",
        &format!(r#"<p><a href="/groups/new">New group</a></p>{table}"#),
    )
}

pub fn count(count: i64) -> Html<String> {
    Html(format!(r#"<span class="group-count">{count}</span>"#))
}

/// Shared by create (`id == None`) and update.
pub fn form(page: &Page, id: Option<i64>, form: &GroupForm, errors: &FieldErrors) -> Html<String> {
    let (title, action) = match id {
        Some(id) => ("Update group", format!("/groups/{id}/edit")),
        None => ("Create group", "/groups/new".to_string()),
    };
    let body = format!(
        r#"<form method="post" action="{action}">
{non_field}
{name}
<button type="submit">Save</button>
</form>"#,
        non_field = non_field_errors(errors),
        name = input("text", "name", "Name", &form.name, errors),
    );
    layout(page, title, &body)
}

pub fn confirm_delete(page: &Page, group: &ContactGroup, members: i64) -> Html<String> {
    let body = format!(
        r#"<p>Are you sure you want to delete <strong>{name}</strong>? Its {members} contact(s) and message history will be deleted too.</p>
<form method="post" action="/groups/{id}/delete">
<button type="submit">Yes, delete</button> <a href="/groups">Cancel</a>
</form>"#,
        name = escape(&group.name),
        id = group.id,
    );
    layout(page, "Delete group", &body)
}
