//! HTML pages. Every user-supplied value goes through `html_escape`.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

use crate::models::user::{Identity, Role, User};

fn layout(title: &str, identity: Option<&Identity>, body: &str) -> String {
    let mut nav = String::from(r#"<a href="/">Home</a>"#);
    match identity {
        Some(identity) => {
            nav.push_str(r#" <a href="/members">Members</a>"#);
            if identity.is_admin() {
                nav.push_str(r#" <a href="/admin">Admin</a>"#);
            }
            nav.push_str(r#" <a href="/logout">Log out</a>"#);
        }
        None => nav.push_str(r#" <a href="/signup">Sign up</a> <a href="/login">Log in</a>"#),
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/styles.css">
</head>
<body>
<nav>{nav}</nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = text(title),
    )
}

#[must_use]
pub fn index(identity: Option<&Identity>) -> String {
    let body = match identity {
        Some(identity) => format!(
            "<h1>Hello, {}!</h1>\n<p>You are signed in as {}.</p>",
            text(&identity.name),
            text(identity.role.as_str()),
        ),
        None => "<h1>Welcome</h1>\n<p>Sign up or log in to see the members area.</p>".to_string(),
    };
    layout("Home", identity, &body)
}

#[must_use]
pub fn signup_form() -> String {
    let body = r#"<h1>Sign up</h1>
<form method="post" action="/signup">
<label>Name <input type="text" name="name" required></label>
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Create account</button>
</form>"#;
    layout("Sign up", None, body)
}

#[must_use]
pub fn login_form() -> String {
    let body = r#"<h1>Log in</h1>
<form method="post" action="/login">
<label>Email <input type="email" name="email" required></label>
<label>Password <input type="password" name="password" required></label>
<button type="submit">Log in</button>
</form>"#;
    layout("Log in", None, body)
}

#[must_use]
pub fn members(identity: &Identity) -> String {
    let body = format!(
        "<h1>Members area</h1>\n<p>Hello, {}.</p>",
        text(&identity.name)
    );
    layout("Members", Some(identity), &body)
}

fn role_form(action: &str, email: &str, label: &str) -> String {
    format!(
        r#"<form method="post" action="{action}"><input type="hidden" name="email" value="{}"><button type="submit">{label}</button></form>"#,
        attr(email),
    )
}

#[must_use]
pub fn admin(identity: &Identity, users: &[User]) -> String {
    let mut rows = String::new();
    for user in users {
        let action = match user.role {
            Role::User => role_form("/promote", &user.email, "Promote"),
            Role::Admin => role_form("/demote", &user.email, "Demote"),
        };
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{action}</td></tr>",
            text(&user.name),
            text(&user.email),
            user.role,
        );
    }

    let body = format!(
        "<h1>Users</h1>\n<table>\n<tr><th>Name</th><th>Email</th><th>Role</th><th></th></tr>\n{rows}</table>"
    );
    layout("Admin", Some(identity), &body)
}

/// Generic message page with a single follow-up link.
#[must_use]
pub fn message(title: &str, message: &str, (href, label): (&str, &str)) -> String {
    let body = format!(
        r#"<h1>{}</h1>
<p>{}</p>
<p><a href="{}">{}</a></p>"#,
        text(title),
        text(message),
        attr(href),
        text(label),
    );
    layout(title, None, &body)
}

#[must_use]
pub fn not_found() -> String {
    message("404 Not Found", "That page does not exist.", ("/", "Home"))
}
