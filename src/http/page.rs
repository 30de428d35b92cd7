//! # Página HTML
//! src/http/page.rs
//!
//! La única página que sirve el servidor.

/// Genera la página con un título y un párrafo
///
/// Ambos textos se escapan, así que pueden venir de la configuración.
///
/// # Ejemplo
/// ```
/// use pool_server::http::page::render;
///
/// let html = render("Simple Server", "Hello from SimpleServer!");
/// assert!(html.contains("<title>Simple Server</title>"));
/// ```
pub fn render(title: &str, content: &str) -> String {
    let title = escape(title);
    let content = escape(content);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 40px; }}
        .container {{ max-width: 800px; margin: 0 auto; }}
        .header {{ background-color: #4caf50; color: white; padding: 20px; border-radius: 5px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{title}</h1>
        </div>
        <div class="content">
            <p>{content}</p>
        </div>
    </div>
</body>
</html>
"#
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
