//! Page capture integration tests

use zyph::capture::{capture_page, main_content, FALLBACK_PARAGRAPHS};
use zyph::page::{Document, StaticPage};

fn paragraph(len: usize, tag: char) -> String {
    std::iter::repeat(tag).take(len).collect()
}

#[test]
fn test_longest_paragraphs_fallback() {
    // twelve paragraphs of lengths 1..=12, shuffled in the document
    let lengths = [5, 12, 1, 9, 3, 11, 7, 2, 10, 4, 8, 6];
    let body: String = lengths
        .iter()
        .map(|&len| format!("<p>{}</p>", paragraph(len, 'x')))
        .collect();
    let doc = Document::parse(&format!("<html><body><div>{}</div></body></html>", body));

    let text = main_content(&doc);
    let kept: Vec<usize> = text.split("\n\n").map(str::len).collect();
    assert_eq!(kept.len(), FALLBACK_PARAGRAPHS);
    assert_eq!(kept, vec![12, 11, 10, 9, 8, 7, 6, 5, 4, 3]);
}

#[test]
fn test_fallback_keeps_document_order_for_ties() {
    let doc = Document::parse("<body><p>bbb</p><p>aaa</p><p>c</p></body>");
    assert_eq!(main_content(&doc), "bbb\n\naaa\n\nc");
}

#[test]
fn test_semantic_container_beats_paragraphs() {
    let doc = Document::parse(
        "<body><p>A much longer paragraph outside the article</p><article><p>Inside</p></article></body>",
    );
    assert_eq!(main_content(&doc), "Inside");
}

#[test]
fn test_body_text_when_nothing_else() {
    let doc = Document::parse("<body><div>Just <span>some</span> text</div></body>");
    assert_eq!(main_content(&doc), "Just some text");
}

#[test]
fn test_full_capture() {
    let page = StaticPage::new(
        "https://blog.example.com/posts/sled",
        r#"<html>
             <head>
               <title>Embedded databases</title>
               <link rel="icon" href="/static/icon.png">
               <link rel="canonical" href="https://blog.example.com/sled">
               <meta name="description" content="Notes on sled">
               <meta property="og:title" content="Sled notes">
               <meta name="twitter:card" content="summary">
             </head>
             <body><main><h1>Sled</h1><p>An embedded database.</p></main></body>
           </html>"#,
    )
    .with_selection("embedded database");

    let content = capture_page(&page);
    assert_eq!(content.title, "Embedded databases");
    assert_eq!(content.content, "Sled\nAn embedded database.");
    assert_eq!(
        content.favicon.as_deref(),
        Some("https://blog.example.com/static/icon.png")
    );
    assert_eq!(content.selected_text, "embedded database");
    assert_eq!(content.metadata.description.as_deref(), Some("Notes on sled"));
    assert_eq!(
        content.metadata.canonical.as_deref(),
        Some("https://blog.example.com/sled")
    );
    assert_eq!(
        content.metadata.open_graph.get("title").map(String::as_str),
        Some("Sled notes")
    );
    assert_eq!(
        content.metadata.twitter.get("card").map(String::as_str),
        Some("summary")
    );

    let json = serde_json::to_value(&content).unwrap();
    assert_eq!(json["selectedText"], "embedded database");
    assert!(json.get("capturedAt").is_some());
}
