//! The support form page.

/// Banner shown above the form after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Warning,
    Error,
}

impl BannerKind {
    fn class(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Values to refill the form with.
    pub email: String,
    pub query: String,
    pub banners: Vec<(BannerKind, String)>,
}

impl Page {
    pub fn with_banner(mut self, kind: BannerKind, text: impl Into<String>) -> Self {
        self.banners.push((kind, text.into()));
        self
    }

    pub fn render(&self) -> String {
        let banners: String = self
            .banners
            .iter()
            .map(|(kind, text)| {
                format!(
                    "<div class=\"banner {}\">{}</div>\n",
                    kind.class(),
                    escape_html(text)
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>AI Customer Support</title>
<style>
body {{ font-family: sans-serif; max-width: 40rem; margin: 2rem auto; padding: 0 1rem; }}
label {{ display: block; margin-top: 1rem; font-weight: bold; }}
input, textarea {{ width: 100%; box-sizing: border-box; padding: 0.5rem; }}
textarea {{ min-height: 8rem; }}
button {{ margin-top: 1rem; padding: 0.5rem 1.5rem; }}
.banner {{ padding: 0.75rem; margin: 1rem 0; border-radius: 4px; }}
.success {{ background: #e6f4ea; }}
.warning {{ background: #fef7e0; }}
.error {{ background: #fce8e6; }}
</style>
</head>
<body>
<h1>AI Customer Support</h1>
{banners}<form method="post" action="/">
<label for="email">Email</label>
<input id="email" name="email" type="email" value="{email}">
<label for="query">Query</label>
<textarea id="query" name="query">{query}</textarea>
<button type="submit">Submit</button>
</form>
</body>
</html>
"#,
            email = escape_html(&self.email),
            query = escape_html(&self.query),
        )
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn refills_form_and_escapes_values() {
        let html = Page {
            email: "a@b.com".into(),
            query: "</textarea><script>".into(),
            banners: Vec::new(),
        }
        .with_banner(BannerKind::Warning, "Please fill both Email and Query!")
        .render();

        assert!(html.contains(r#"value="a@b.com""#));
        assert!(html.contains("&lt;/textarea&gt;&lt;script&gt;"));
        assert!(html.contains(r#"<div class="banner warning">Please fill both Email and Query!</div>"#));
    }

    #[test]
    fn blank_page_has_no_banner() {
        assert!(!Page::default().render().contains("class=\"banner"));
    }
}
