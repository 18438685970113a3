// SPDX-License-Identifier: MIT

//! Minimal server-rendered HTML views.

use axum::http::StatusCode;

use crate::models::User;
use crate::session::Claims;

/// Flash banner shown on the profile page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Saved,
    CsrfRejected,
}

/// Escape a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
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

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape(title),
        body
    )
}

pub fn index_page(user: Option<&Claims>) -> String {
    let body = match user {
        Some(claims) => {
            let who = claims
                .name
                .as_deref()
                .or(claims.email.as_deref())
                .unwrap_or(&claims.sub);
            format!(
                "<h1>Profile Portal</h1>\n\
                 <p>Signed in as {}.</p>\n\
                 <p><a href=\"/profile\">Your profile</a> · <a href=\"/logout\">Log out</a></p>",
                escape(who)
            )
        }
        None => "<h1>Profile Portal</h1>\n\
                 <p>You are not signed in.</p>\n\
                 <p><a href=\"/login\">Log in</a></p>"
            .to_string(),
    };

    layout("Profile Portal", &body)
}

pub fn profile_page(
    claims: &Claims,
    record: Option<&User>,
    csrf_token: &str,
    banner: Option<Banner>,
) -> String {
    let banner_html = match banner {
        Some(Banner::Saved) => "<p class=\"flash ok\">Profile updated.</p>\n",
        Some(Banner::CsrfRejected) => {
            "<p class=\"flash error\">The form could not be verified. Please try again.</p>\n"
        }
        None => "",
    };

    let picture_html = claims
        .picture
        .as_deref()
        .map(|src| format!("<img src=\"{}\" alt=\"\" width=\"64\" height=\"64\">\n", escape(src)))
        .unwrap_or_default();

    let first_name = record.and_then(|u| u.first_name.as_deref()).unwrap_or("");
    let last_name = record.and_then(|u| u.last_name.as_deref()).unwrap_or("");
    let age = record
        .and_then(|u| u.age)
        .map(|age| age.to_string())
        .unwrap_or_default();

    let body = format!(
        "<h1>Your profile</h1>\n\
         {banner}{picture}\
         <p>Signed in as {name} &lt;{email}&gt;</p>\n\
         <form action=\"/profile/update\" method=\"post\">\n\
         <input type=\"hidden\" name=\"csrf_token\" value=\"{csrf}\">\n\
         <label>First name <input type=\"text\" name=\"first_name\" maxlength=\"100\" value=\"{first}\"></label>\n\
         <label>Last name <input type=\"text\" name=\"last_name\" maxlength=\"100\" value=\"{last}\"></label>\n\
         <label>Age <input type=\"number\" name=\"age\" min=\"0\" max=\"150\" value=\"{age}\"></label>\n\
         <button type=\"submit\">Save</button>\n\
         </form>\n\
         <p><a href=\"/\">Home</a> · <a href=\"/logout\">Log out</a></p>",
        banner = banner_html,
        picture = picture_html,
        name = escape(claims.name.as_deref().unwrap_or(&claims.sub)),
        email = escape(claims.email.as_deref().unwrap_or("")),
        csrf = escape(csrf_token),
        first = escape(first_name),
        last = escape(last_name),
        age = escape(&age),
    );

    layout("Your profile", &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Home</a> · <a href=\"/login\">Log in</a></p>",
        status.as_u16(),
        escape(message)
    );
    layout("Error", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape("<script>alert('x')</script>"),
            "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"
        );
        assert_eq!(escape("a & \"b\""), "a &amp; &quot;b&quot;");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_profile_page_escapes_stored_values() {
        let claims = Claims {
            sub: "abc123".to_string(),
            email: Some("a@example.com".to_string()),
            name: Some("Jane".to_string()),
            picture: None,
        };
        let page = profile_page(&claims, None, "\"><script>", None);

        assert!(!page.contains("\"><script>"));
        assert!(page.contains("&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_index_page_shows_login_when_anonymous() {
        let page = index_page(None);
        assert!(page.contains("href=\"/login\""));
    }
}
