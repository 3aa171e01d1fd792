use axum::response::Html;
use sph_core::{FieldErrors, LoginForm, ProfileForm, SignUpForm};

use super::{Page, escape, input, layout, non_field_errors};

pub fn login(form: &LoginForm, errors: &FieldErrors) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/login">
{non_field}
{username}
{password}
<input type="hidden" name="next" value="{next}">
<button type="submit">Log in</button>
</form>
<p>No account? <a href="/signup">Sign up</a></p>"#,
        non_field = non_field_errors(errors),
        username = input("text", "username", "Username", &form.username, errors),
        password = input("password", "password", "Password", "", errors),
        next = escape(&form.next),
    );
    layout(&Page::anonymous(), "Log in", &body)
}

pub fn signup(form: &SignUpForm, errors: &FieldErrors) -> Html<String> {
    let body = format!(
        r#"<form method="post" action="/signup">
{non_field}
{username}
{email}
{password1}
{password2}
<button type="submit">Sign up</button>
</form>"#,
        non_field = non_field_errors(errors),
        username = input("text", "username", "Username", &form.username, errors),
        email = input("email", "email", "Email", &form.email, errors),
        password1 = input("password", "password1", "Password", "", errors),
        password2 = input("password", "password2", "Password confirmation", "", errors),
    );
    layout(&Page::anonymous(), "Sign up", &body)
}

/// `is_admin` adds the link to the installation-wide SMS settings.
pub fn profile(
    page: &Page,
    form: &ProfileForm,
    errors: &FieldErrors,
    is_admin: bool,
) -> Html<String> {
    let settings = if is_admin {
        r#"<p><a href="/settings/sms">SMS provider settings</a></p>"#
    } else {
        ""
    };
    let body = format!(
        r#"<form method="post" action="/profile">
{non_field}
{first}
{last}
{public_email}
{institution}
{location}
<button type="submit">Save changes</button>
</form>
{settings}"#,
        non_field = non_field_errors(errors),
        first = input("text", "first_name", "First name", &form.first_name, errors),
        last = input("text", "last_name", "Last name", &form.last_name, errors),
        public_email = input("email", "public_email", "Public email", &form.public_email, errors),
        institution = input("text", "institution", "Institution", &form.institution, errors),
        location = input("text", "location", "Location", &form.location, errors),
    );
    layout(page, "Profile", &body)
}
