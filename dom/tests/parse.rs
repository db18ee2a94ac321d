use std::cell::RefCell;
use std::rc::Rc;

use dom::parser::Parser;
use dom::{Dom, NodeKind, Selector};

fn parse(source: &str) -> Dom {
    Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn first(dom: &Dom, selector: &Selector) -> dom::NodeId {
    dom.find_first(dom.root(), selector, &[])
        .expect("no element matched")
}

#[test]
fn nested_elements_and_text() {
    let dom = parse("<div class=\"a\"><p>hello <b>world</b></p></div>");
    let div = first(&dom, &Selector::class("a"));
    assert_eq!(dom.tag_name(div), Some("div"));
    assert_eq!(dom.text_content(div), "hello world");
    assert_eq!(dom.element_children(div).count(), 1);
}

#[test]
fn attributes_keep_source_order_and_first_duplicate() {
    let dom = parse("<div data-b='2' data-a=1 data-b=\"3\" hidden></div>");
    let div = dom.element_children(dom.root()).next().unwrap();
    let attrs: Vec<(&str, &str)> = dom.element(div).unwrap().attrs().collect();
    assert_eq!(attrs, vec![("data-b", "2"), ("data-a", "1"), ("hidden", "")]);
}

#[test]
fn character_references_decoded_outside_scripts() {
    let dom = parse(
        "<p title=\"a &amp; b\">1 &lt; 2</p><script type=\"json\">{\"x\": \"&amp;\"}</script>",
    );
    let p = first(&dom, &Selector::attr("title", "a & b"));
    assert_eq!(dom.text_content(p), "1 < 2");
    let script = first(&dom, &Selector::attr("type", "json"));
    assert_eq!(dom.text_content(script), "{\"x\": \"&amp;\"}");
}

#[test]
fn script_body_is_not_parsed_as_markup() {
    let dom = parse("<div><script>if (a < b) { x = '<p>'; }</script><span></span></div>");
    let div = dom.element_children(dom.root()).next().unwrap();
    let tags: Vec<&str> = dom
        .element_children(div)
        .map(|c| dom.tag_name(c).unwrap())
        .collect();
    assert_eq!(tags, vec!["script", "span"]);
}

#[test]
fn void_and_self_closing_elements_take_no_children() {
    let dom = parse("<div><br><img src=x><input/><span>t</span></div>");
    let div = dom.element_children(dom.root()).next().unwrap();
    assert_eq!(dom.element_children(div).count(), 4);
}

#[test]
fn mismatched_end_tag_closes_to_matching_element() {
    let dom = parse("<section><div><p>text</section><aside></aside>");
    let top: Vec<&str> = dom
        .element_children(dom.root())
        .map(|c| dom.tag_name(c).unwrap())
        .collect();
    assert_eq!(top, vec!["section", "aside"]);
}

#[test]
fn stray_end_tag_is_ignored() {
    let dom = parse("<div></span><p></p></div>");
    let div = dom.element_children(dom.root()).next().unwrap();
    assert_eq!(dom.element_children(div).count(), 1);
}

#[test]
fn comments_and_doctype_skipped() {
    let dom = parse("<!DOCTYPE html><!-- <div class=x></div> --><div class=\"y\"></div>");
    assert_eq!(dom.element_children(dom.root()).count(), 1);
    assert!(dom.find_first(dom.root(), &Selector::class("x"), &[]).is_none());
}

#[test]
fn unclosed_constructs_are_errors() {
    for source in [
        "<div><!-- open",
        "<div class=\"x",
        "<div class=x",
        "<script>var a;",
    ] {
        let errors = Parser::new(source.to_string(), 7)
            .parse()
            .expect_err(source);
        assert_eq!(errors.len(), 1, "{}", source);
        assert_eq!(errors[0].file_id, 7);
        assert!(errors[0].message.starts_with("unclosed"), "{}", errors[0].message);
    }
}

#[test]
fn element_span_covers_start_tag() {
    let source = "<p>\n  <div class=\"xblock\" data-init=\"X\">inner</div></p>";
    let dom = parse(source);
    let div = first(&dom, &Selector::class("xblock"));
    let span = dom.span(div).unwrap();
    assert_eq!(&source[span], "<div class=\"xblock\" data-init=\"X\">");
}

#[test]
fn immediate_descendants_stop_at_matches() {
    let dom = parse(
        "<div id=root>\
           <div class=\"m\" id=a><div class=\"m\" id=a1></div></div>\
           <section><div class=\"m\" id=b></div></section>\
           <div class=\"other\"><div class=\"m\" id=c></div></div>\
         </div>",
    );
    let root = first(&dom, &Selector::attr("id", "root"));
    let found: Vec<&str> = dom
        .immediate_descendants(root, &Selector::class("m"))
        .into_iter()
        .map(|n| dom.attr(n, "id").unwrap())
        .collect();
    assert_eq!(found, vec!["a", "b", "c"]);
}

#[test]
fn find_first_respects_boundaries() {
    let dom = parse(
        "<div id=root><div class=\"block\"><i class=\"args\" id=inner></i></div>\
         <i class=\"args\" id=outer></i></div>",
    );
    let root = first(&dom, &Selector::attr("id", "root"));
    let found = dom
        .find_first(root, &Selector::class("args"), &[Selector::class("block")])
        .unwrap();
    assert_eq!(dom.attr(found, "id"), Some("outer"));
}

#[test]
fn siblings_exclude_self_and_text() {
    let dom = parse("<ul><li id=a></li> text <li id=b></li><li id=c></li></ul>");
    let b = first(&dom, &Selector::attr("id", "b"));
    let ids: Vec<&str> = dom
        .siblings(b)
        .into_iter()
        .map(|n| dom.attr(n, "id").unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "c"]);
}

#[test]
fn add_class_and_data_store() {
    let mut dom = parse("<div class=\" xblock \"></div>");
    let div = first(&dom, &Selector::class("xblock"));
    dom.add_class(div, "xblock-initialized");
    dom.add_class(div, "xblock-initialized");
    assert_eq!(dom.attr(div, "class"), Some("xblock xblock-initialized"));

    assert!(dom.data(div, "initialized").is_none());
    dom.set_data(div, "initialized", serde_json::Value::Bool(true));
    assert_eq!(dom.data(div, "initialized"), Some(&serde_json::Value::Bool(true)));
}

#[test]
fn outer_html_round_trips_attributes_and_escapes() {
    let dom = parse("<div class=\"xblock\" data-name=\"a &quot;b&quot;\">x &amp; y<br></div>");
    let div = first(&dom, &Selector::class("xblock"));
    assert_eq!(
        dom.outer_html(div),
        "<div class=\"xblock\" data-name=\"a &quot;b&quot;\">x &amp; y<br></div>"
    );
}

#[test]
fn trigger_bubbles_to_ancestors() {
    let mut dom = parse("<div id=outer><div id=inner></div></div>");
    let outer = first(&dom, &Selector::attr("id", "outer"));
    let inner = first(&dom, &Selector::attr("id", "inner"));

    let seen = Rc::new(RefCell::new(Vec::new()));
    for node in [outer, inner] {
        let seen = Rc::clone(&seen);
        dom.on(node, "ping", move |event| {
            seen.borrow_mut().push((event.target, event.current_target));
        });
    }

    assert_eq!(dom.trigger(inner, "ping"), 2);
    assert_eq!(*seen.borrow(), vec![(inner, inner), (inner, outer)]);
    assert_eq!(dom.trigger(inner, "other"), 0);
}

#[test]
fn selector_display_reads_like_css() {
    let selector = Selector::class("xblock").and_attr("data-request-token", "abc");
    assert_eq!(selector.to_string(), ".xblock[data-request-token=\"abc\"]");
    assert_eq!(Selector::default().to_string(), "*");
}

#[test]
fn root_is_document() {
    let dom = parse("");
    assert!(matches!(dom.kind(dom.root()), NodeKind::Document));
    assert!(dom.is_empty());
}

#[test]
fn deeply_nested_markup_is_walked_without_recursion() {
    const DEPTH: usize = 100_000;
    let inner = r#"<section class="xblock" data-name="deep"><script class="args">{}</script>text</section>"#;
    let source = format!("{}{}{}", "<div>".repeat(DEPTH), inner, "</div>".repeat(DEPTH));
    let dom = parse(&source);
    let root = dom.root();

    let found = dom.immediate_descendants(root, &Selector::class("xblock"));
    assert_eq!(found.len(), 1);
    assert_eq!(dom.attr(found[0], "data-name"), Some("deep"));
    assert!(dom.find_first(root, &Selector::class("args"), &[]).is_some());
    assert!(
        dom.find_first(root, &Selector::class("args"), &[Selector::class("xblock")])
            .is_none()
    );
    assert_eq!(dom.text_content(root), "{}text");
    assert_eq!(dom.outer_html(root), source);
}
