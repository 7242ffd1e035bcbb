// Minimal server-rendered pages

use crate::api::flash::Notice;
use crate::auth::csrf::CSRF_FIELD;
use crate::domain::{Role, SessionSnapshot};

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn layout(title: &str, notice: Option<Notice>, body: &str) -> String {
    let notice = notice
        .map(|n| {
            let class = if n.is_error() { "error" } else { "success" };
            format!(r#"<p class="notice {}">{}</p>"#, class, escape_html(n.message()))
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} | IT Helpdesk</title></head>
<body>
<main>
<h1>{title}</h1>
{notice}
{body}
</main>
</body>
</html>"#,
        title = escape_html(title),
        notice = notice,
        body = body,
    )
}

pub fn login_page(notice: Option<Notice>, csrf_token: &str) -> String {
    let form = format!(
        r#"<form method="post" action="/auth/login">
<input type="hidden" name="{field}" value="{token}">
<label>Username <input name="username" maxlength="50" autocomplete="username" required></label>
<label>Password <input name="password" type="password" maxlength="128" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
</form>"#,
        field = CSRF_FIELD,
        token = escape_html(csrf_token),
    );
    layout("Log in", notice, &form)
}

pub fn dashboard_page(user: &SessionSnapshot, notice: Option<Notice>, csrf_token: &str) -> String {
    let admin_links = match user.role {
        Role::SuperAdmin => {
            r#"<p><a href="/admin/audit/verify">Verify audit trail</a></p>"#
        }
        Role::Admin | Role::Department => "",
    };

    let body = format!(
        r#"<p>Signed in as <strong>{username}</strong> ({email}), role <code>{role}</code>.</p>
{admin_links}
<form method="post" action="/auth/logout">
<input type="hidden" name="{field}" value="{token}">
<button type="submit">Log out</button>
</form>"#,
        username = escape_html(&user.username),
        email = escape_html(&user.email),
        role = user.role,
        admin_links = admin_links,
        field = CSRF_FIELD,
        token = escape_html(csrf_token),
    );
    layout("Dashboard", notice, &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">'&'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_login_page_embeds_token_and_notice() {
        let html = login_page(Some(Notice::LoginFailed), "abc123");
        assert!(html.contains(r#"name="_csrf" value="abc123""#));
        assert!(html.contains("Invalid username or password."));
    }

    #[test]
    fn test_dashboard_escapes_user_fields() {
        let user = SessionSnapshot {
            id: 1,
            username: "alice".to_string(),
            email: "<script>@x".to_string(),
            role: Role::SuperAdmin,
        };
        let html = dashboard_page(&user, None, "t");
        assert!(!html.contains("<script>"));
        assert!(html.contains("/admin/audit/verify"));
    }
}
