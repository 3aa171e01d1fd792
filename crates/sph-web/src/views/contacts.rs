use std::fmt::Write;

use axum::response::Html;
use sph_core::{ContactForm, ContactFormset, FieldErrors, FormsetErrors, FORMSET_PREFIX};
use sph_db::{Contact, ContactGroup};

use super::{
    Page, error_list, escape, format_timestamp, group_name, group_options, group_select, input,
    layout, non_field_errors,
};

fn contact_table(contacts: &[Contact], groups: &[ContactGroup]) -> String {
    if contacts.is_empty() {
        return "<p>No contacts yet.</p>".to_string();
    }
    let mut rows = String::new();
    for contact in contacts {
        let _ = write!(
            rows,
            r#"<tr><td><a href="/contacts/{id}">{name}</a></td><td>{mobile}</td><td>{email}</td><td>{group}</td><td>{created}</td></tr>"#,
            id = contact.id,
            name = escape(&contact.full_name()),
            mobile = escape(&contact.mobile),
            email = escape(&contact.email),
            group = escape(group_name(groups, contact.category_id)),
            created = format_timestamp(contact.created_at),
        );
    }
    format!(
        "<table><thead><tr><th>Name</th><th>Mobile</th><th>Email</th><th>Group</th><th>Created</th></tr></thead><tbody>{rows}</tbody></table>"
    )
}

pub fn list(page: &Page, contacts: &[Contact], groups: &[ContactGroup]) -> Html<String> {
    let body = format!(
        r#"<p><a href="/contacts/new">Edit contact list</a> | <a href="/contacts/import">Import sheet</a> | <span id="contact-count">{count}</span> contacts</p>
{table}"#,
        count = contacts.len(),
        table = contact_table(contacts, groups),
    );
    layout(page, "Contacts", &body)
}

/// Bare fragment, embedded by dashboards.
pub fn count(count: i64) -> Html<String> {
    Html(format!(r#"<span class="contact-count">{count}</span>"#))
}

pub fn search(page: &Page, term: &str, contacts: &[Contact], groups: &[ContactGroup]) -> Html<String> {
    let body = format!(
        "<p>{} result(s) for <strong>{}</strong></p>\n{}",
        contacts.len(),
        escape(term),
        contact_table(contacts, groups),
    );
    layout(page, "Search", &body)
}

pub fn detail(page: &Page, contact: &Contact, group: &ContactGroup) -> Html<String> {
    let body = format!(
        r#"<dl>
<dt>First name</dt><dd>{first}</dd>
<dt>Last name</dt><dd>{last}</dd>
<dt>Email</dt><dd>{email}</dd>
<dt>Mobile</dt><dd>{mobile}</dd>
<dt>ID number</dt><dd>{id_number}</dd>
<dt>Group</dt><dd>{group}</dd>
<dt>Created</dt><dd>{created}</dd>
</dl>
<p><a href="/contacts/{id}/edit">Edit</a> | <a href="/contacts/{id}/delete">Delete</a></p>"#,
        first = escape(&contact.first_name),
        last = escape(&contact.last_name),
        email = escape(&contact.email),
        mobile = escape(&contact.mobile),
        id_number = escape(contact.id_number.as_deref().unwrap_or("")),
        group = escape(&group.name),
        created = format_timestamp(contact.created_at),
        id = contact.id,
    );
    layout(page, &contact.full_name(), &body)
}

pub fn edit(
    page: &Page,
    id: i64,
    form: &ContactForm,
    groups: &[ContactGroup],
    errors: &FieldErrors,
) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/contacts/{id}/edit">
{non_field}
{first}
{last}
{email}
{mobile}
{id_number}
{category}
<button type="submit">Save</button>
</form>"#,
        non_field = non_field_errors(errors),
        first = input("text", "first_name", "First name", &form.first_name, errors),
        last = input("text", "last_name", "Last name", &form.last_name, errors),
        email = input("email", "email", "Email", &form.email, errors),
        mobile = input("tel", "mobile", "Mobile", &form.mobile, errors),
        id_number = input("text", "id_number", "ID number", &form.id_number, errors),
        category = group_select("category", "Group", groups, &form.category, errors),
    );
    layout(page, "Update contact", &body)
}

pub fn confirm_delete(page: &Page, contact: &Contact) -> Html<String> {
    let body = format!(
        r#"<p>Are you sure you want to delete <strong>{name}</strong> ({mobile})?</p>
<form method="post" action="/contacts/{id}/delete">
<button type="submit">Yes, delete</button> <a href="/contacts/{id}">Cancel</a>
</form>"#,
        name = escape(&contact.full_name()),
        mobile = escape(&contact.mobile),
        id = contact.id,
    );
    layout(page, "Delete contact", &body)
}

/// The bulk form. Saving it replaces the whole contact list.
pub fn formset(
    page: &Page,
    formset: &ContactFormset,
    groups: &[ContactGroup],
    errors: &FormsetErrors,
) -> Html<String> {
    let no_errors = FieldErrors::new();
    let mut rows = String::new();
    for (i, row) in formset.rows().iter().enumerate() {
        let row_errors = errors.rows.get(i).unwrap_or(&no_errors);
        let _ = write!(
            rows,
            r#"<tr>
<td>{full_name_errs}<input type="text" name="{FORMSET_PREFIX}-{i}-full_name" value="{full_name}"></td>
<td>{mobile_errs}<input type="tel" name="{FORMSET_PREFIX}-{i}-mobile" value="{mobile}"></td>
<td>{category_errs}<select name="{FORMSET_PREFIX}-{i}-category">{options}</select></td>
</tr>"#,
            full_name_errs = error_list(row_errors.get("full_name")),
            full_name = escape(&row.full_name),
            mobile_errs = error_list(row_errors.get("mobile")),
            mobile = escape(&row.mobile),
            category_errs = error_list(row_errors.get("category")),
            options = group_options(groups, &row.category),
        );
    }

    let body = format!(
        r#"<p>Saving replaces your whole contact list. Rows missing a name, mobile or group are left out.</p>
{non_form}
<form method="post" action="/contacts/new">
<input type="hidden" name="{FORMSET_PREFIX}-TOTAL_FORMS" value="{total}">
<table><thead><tr><th>Full name</th><th>Mobile</th><th>Group</th></tr></thead>
<tbody>
{rows}
</tbody></table>
<button type="submit">Save contacts</button>
</form>"#,
        non_form = error_list(&errors.non_form),
        total = formset.rows().len(),
    );
    layout(page, "Create contacts", &body)
}
