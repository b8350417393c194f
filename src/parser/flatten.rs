use scraper::node::Node;
use scraper::ElementRef;

/// Elements whose text never belongs in the article body.
const SKIPPED: &[&str] = &["script", "style", "template"];

const DEFAULT_ALT: &str = "image";

/// Flatten an element into text, one line per text fragment.
///
/// Links and images are rendered as inline markers in place of the element,
/// so the marker lands exactly where the element sat in document order.
pub fn flatten(container: ElementRef) -> String {
    let mut fragments = Vec::new();
    collect(container, &mut fragments);
    fragments.join("\n").trim().to_string()
}

fn collect(element: ElementRef, out: &mut Vec<String>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let s: &str = text;
                out.push(s.to_owned());
            }
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                match inline_marker(child) {
                    Some(marker) => out.push(marker),
                    None if SKIPPED.contains(&child.value().name()) => {}
                    None => collect(child, out),
                }
            }
            _ => {}
        }
    }
}

/// `text [URL: href]` for links, `[alt: src]` for images.
/// `None` when the element is neither, or lacks its href/src.
pub fn inline_marker(element: ElementRef) -> Option<String> {
    let el = element.value();
    match el.name() {
        "a" => {
            let href = el.attr("href").filter(|h| !h.is_empty())?;
            let text: String = element.text().collect();
            Some(format!("{} [URL: {}]", text.trim(), href))
        }
        "img" => {
            let src = el.attr("src").filter(|s| !s.is_empty())?;
            let alt = el.attr("alt").unwrap_or(DEFAULT_ALT);
            Some(format!("[{}: {}]", alt, src))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::*;

    fn flat(fragment: &str) -> String {
        let html = Html::parse_fragment(&format!("<div id=\"root\">{}</div>", fragment));
        let sel = Selector::parse("#root").unwrap();
        flatten(html.select(&sel).next().unwrap())
    }

    #[test]
    fn link_marker() {
        assert_eq!(
            flat(r#"<a href="https://x.test">  here </a>"#),
            "here [URL: https://x.test]"
        );
    }

    #[test]
    fn link_without_href_untouched() {
        assert_eq!(flat("<a>plain</a>"), "plain");
        assert_eq!(flat(r#"<a href="">empty</a>"#), "empty");
    }

    #[test]
    fn image_markers() {
        assert_eq!(flat(r#"<img src="https://x.test/a.png" alt="cat">"#), "[cat: https://x.test/a.png]");
        assert_eq!(flat(r#"<img src="https://x.test/a.png">"#), "[image: https://x.test/a.png]");
        assert_eq!(flat(r#"<img src="https://x.test/a.png" alt="">"#), "[: https://x.test/a.png]");
        assert_eq!(flat(r#"<p>x<img alt="nosrc">y</p>"#), "x\ny");
    }

    #[test]
    fn image_inside_bare_anchor_still_flattened() {
        assert_eq!(
            flat(r#"<a name="top"><img src="https://x.test/b.png" alt="b"></a>"#),
            "[b: https://x.test/b.png]"
        );
    }

    #[test]
    fn linked_image_keeps_link_only() {
        assert_eq!(
            flat(r#"<a href="https://x.test/full.png"><img src="https://x.test/thumb.png"></a>"#),
            "[URL: https://x.test/full.png]"
        );
    }

    #[test]
    fn fragments_in_document_order() {
        let text = flat(
            r#"<h2>Title</h2><p>See <a href="https://x.test">here</a> and <img src="https://x.test/i.png" alt="pic"> ok</p>"#,
        );
        assert_eq!(
            text,
            "Title\nSee \nhere [URL: https://x.test]\n and \n[pic: https://x.test/i.png]\n ok"
        );
    }

    #[test]
    fn skips_scripts_and_comments() {
        assert_eq!(
            flat("<p>a</p><script>var x = 1;</script><!-- note --><style>p{}</style><p>b</p>"),
            "a\nb"
        );
    }
}
