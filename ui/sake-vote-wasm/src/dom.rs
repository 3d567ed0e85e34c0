//! DOM helpers and element binding macros.
//!
//! Each page module declares an `Elements` struct and resolves it once at
//! startup with the `get_*!` macros below.

use gloo_utils::document;
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlOptionElement, HtmlSelectElement};

// ── Helpers ──

pub fn window() -> web_sys::Window {
    gloo_utils::window()
}

pub fn by_id(id: &str) -> Option<Element> {
    document().get_element_by_id(id)
}

pub fn by_id_typed<T: JsCast>(id: &str) -> Option<T> {
    by_id(id).and_then(|e| e.dyn_into::<T>().ok())
}

/// Query all matching elements within a parent element.
pub fn query_all_within(parent: &Element, selector: &str) -> Vec<Element> {
    let Ok(nl) = parent.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nl.length())
        .filter_map(|i| nl.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn toggle_class(el: &Element, cls: &str, force: bool) {
    let _ = el.class_list().toggle_with_force(cls, force);
}

pub fn has_class(el: &Element, cls: &str) -> bool {
    el.class_list().contains(cls)
}

pub fn set_attr(el: &Element, name: &str, value: &str) {
    let _ = el.set_attribute(name, value);
}

pub fn set_busy(el: &Element, busy: bool) {
    set_attr(el, "aria-busy", if busy { "true" } else { "false" });
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    document().create_element(tag)
}

pub fn create_option(
    value: &str,
    text: &str,
    selected: bool,
) -> Result<HtmlOptionElement, JsValue> {
    let opt: HtmlOptionElement = create_element("option")?.dyn_into()?;
    opt.set_value(value);
    opt.set_text_content(Some(text));
    opt.set_selected(selected);
    Ok(opt)
}

/// Replace a select's options with a placeholder followed by `(value, text)`.
pub fn fill_select<'a>(
    sel: &HtmlSelectElement,
    placeholder: &str,
    options: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<(), JsValue> {
    sel.set_inner_html("");
    let blank = create_option("", placeholder, true)?;
    sel.append_child(&blank)?;
    for (value, text) in options {
        let opt = create_option(value, text, false)?;
        sel.append_child(&opt)?;
    }
    Ok(())
}

pub fn body_attr(name: &str) -> Option<String> {
    document().body()?.get_attribute(name)
}

pub fn body_api_url() -> Option<String> {
    body_attr("data-api-url").filter(|s| !s.trim().is_empty())
}

/// Closest ancestor of an event target matching `selector`.
pub fn closest(event: &web_sys::Event, selector: &str) -> Option<Element> {
    let target: Element = event.target()?.dyn_into().ok()?;
    target.closest(selector).ok()?
}

/// Status line; `error` switches the styling.
pub fn set_msg(el: &Element, text: &str, error: bool) {
    set_text(el, text);
    toggle_class(el, "error", error);
}

// ── Markup ──

/// Escape `& < > "` for interpolation into markup and attribute values.
pub fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Absolute `http(s)` and root-relative paths are kept; anything else is
/// resolved against `prefix`.
pub fn resolve_image_src(raw: &str, prefix: &str) -> String {
    let raw = raw.trim();
    let kept = raw.is_empty()
        || raw.starts_with("http://")
        || raw.starts_with("https://")
        || raw.starts_with('/');
    if kept {
        return raw.to_owned();
    }
    format!("{prefix}{raw}")
}

// ── Binding macros ──

macro_rules! get_el {
    ($id:expr) => {
        $crate::dom::by_id($id).ok_or_else(|| {
            ::wasm_bindgen::JsValue::from_str(&format!("missing element #{}", $id))
        })?
    };
}

macro_rules! get_select {
    ($id:expr) => {
        $crate::dom::by_id_typed::<::web_sys::HtmlSelectElement>($id).ok_or_else(|| {
            ::wasm_bindgen::JsValue::from_str(&format!("missing select #{}", $id))
        })?
    };
}

macro_rules! get_button {
    ($id:expr) => {
        $crate::dom::by_id_typed::<::web_sys::HtmlButtonElement>($id).ok_or_else(|| {
            ::wasm_bindgen::JsValue::from_str(&format!("missing button #{}", $id))
        })?
    };
}

pub(crate) use get_button;
pub(crate) use get_el;
pub(crate) use get_select;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(esc(r#"<a href="x">&</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
        assert_eq!(esc("獺祭 '45'"), "獺祭 '45'");
    }

    #[test]
    fn image_paths_resolve_against_prefix() {
        assert_eq!(
            resolve_image_src("https://cdn.example/a.jpg", "../"),
            "https://cdn.example/a.jpg"
        );
        assert_eq!(resolve_image_src("/images/a.jpg", "../"), "/images/a.jpg");
        assert_eq!(resolve_image_src("images/a.jpg", "../"), "../images/a.jpg");
        assert_eq!(resolve_image_src("", "../"), "");
    }
}
