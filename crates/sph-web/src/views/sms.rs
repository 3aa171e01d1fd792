use std::fmt::Write;

use axum::response::Html;
use sph_core::{FieldErrors, SmsForm, SmsSettingsForm};
use sph_db::{ContactGroup, Sms};

use super::{Page, escape, format_timestamp, group_select, input, layout, non_field_errors, textarea};

pub fn list(page: &Page, messages: &[Sms]) -> Html<String> {
    let mut rows = String::new();
    for sms in messages {
        let _ = write!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            format_timestamp(sms.created_at),
            escape(&sms.group_name),
            escape(&sms.message),
        );
    }
    let table = if messages.is_empty() {
        "<p>No messages yet.</p>".to_string()
    } else {
        format!(
            "<table><thead><tr><th>Sent</th><th>Group</th><th>Message</th></tr></thead><tbody>{rows}</tbody></table>"
        )
    };
    layout(
        page,
        "Messages",
        &format!(r#"<p><a href="/messages/new">New message</a></p>{table}"#),
    )
}

pub fn compose(
    page: &Page,
    form: &SmsForm,
    groups: &[ContactGroup],
    errors: &FieldErrors,
) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/messages/new">
{non_field}
{category}
{message}
<button type="submit">Save message</button>
</form>"#,
        non_field = non_field_errors(errors),
        category = group_select("category", "Recipients", groups, &form.category, errors),
        message = textarea("message", "Message", &form.message, errors),
    );
    layout(page, "New message", &body)
}

pub fn settings(page: &Page, form: &SmsSettingsForm, errors: &FieldErrors) -> Html<String> {
    let body = format!(
        r#"<p>Provider credentials shared by the whole installation. Leave the API key blank to keep the current one.</p>
<form method="post" action="/settings/sms">
{non_field}
{user_name}
{api_key}
<button type="submit">Save</button>
</form>"#,
        non_field = non_field_errors(errors),
        user_name = input("text", "user_name", "Username", &form.user_name, errors),
        api_key = input("password", "api_key", "API key", "", errors),
    );
    layout(page, "SMS settings", &body)
}
