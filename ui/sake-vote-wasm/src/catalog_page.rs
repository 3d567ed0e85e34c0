//! Public sake catalog: every listed sake with a sort select.

use crate::dom::{self, esc};
use crate::events;
use crate::ranking_view::ja_collation;
use crate::state::AppContext;
use gloo_console::error;
use std::cell::RefCell;
use std::rc::Rc;
use sv_api_types::CatalogItem;
use sv_core::catalog::{CatalogSort, short_desc, sorted_catalog_by, status_line};
use sv_core::load_catalog;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlSelectElement};

const MSG_LOADING: &str = "出品酒リストを読み込んでいます…";
const MSG_EMPTY: &str = "公開中の出品酒はまだ登録されていません。";
const MSG_FAILED: &str = "出品酒リストの取得に失敗しました。時間をおいて再度お試しください。";
const MORE: &str = "続きを読む";
const LESS: &str = "閉じる";

// ── Markup ──

fn pill(class: &str, text: &str) -> String {
    format!(r#"<span class="pill{class}">{}</span>"#, esc(text))
}

fn pills_html(item: &CatalogItem) -> String {
    let mut pills = String::new();
    if let Some(brewery) = &item.brewery {
        pills.push_str(&match &item.brewery_url {
            Some(url) => format!(
                r#"<a href="{}" class="pill link" target="_blank" rel="noopener noreferrer">{}</a>"#,
                esc(url),
                esc(brewery)
            ),
            None => pill("", brewery),
        });
    }
    if let Some(category) = &item.category {
        pills.push_str(&pill(" pill--type", category));
    }
    if let Some(pref) = &item.pref_name {
        pills.push_str(&pill(" pill--pref", pref));
    }
    if let Some(round) = &item.round {
        pills.push_str(&pill(" pill--round", &format!("第{round}回出品")));
    }
    pills
}

fn desc_html(desc: &str) -> String {
    match short_desc(desc) {
        None => format!(r#"<span class="sake-card__desc-short">{}</span>"#, esc(desc)),
        Some(short) => format!(
            r#"<span class="sake-card__desc-short">{}</span><span class="sake-card__desc-full" hidden>{}</span><button type="button" class="sake-card__more-btn">{MORE}</button>"#,
            esc(&short),
            esc(desc)
        ),
    }
}

fn shop_links_html(item: &CatalogItem) -> String {
    let shops = [
        (&item.amazon_url, "btn-amazon", "Amazonで見る"),
        (&item.rakuten_url, "btn-rakuten", "楽天で見る"),
    ];
    let links: String = shops
        .iter()
        .filter_map(|(url, class, label)| {
            url.as_deref().map(|url| {
                format!(
                    r#"<a href="{}" class="btn-sm {class}" target="_blank" rel="noopener noreferrer sponsored nofollow">{label}</a>"#,
                    esc(url)
                )
            })
        })
        .collect();
    if links.is_empty() {
        return links;
    }
    format!(r#"<div class="sake-card__links">{links}</div>"#)
}

pub fn catalog_card_html(item: &CatalogItem, image_prefix: &str) -> String {
    let name = esc(&item.name);
    let src = dom::resolve_image_src(&item.img, image_prefix);
    let thumb = if src.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div class="sake-card__thumb-wrap"><img src="{}" alt="{name}" class="sake-card__thumb" loading="lazy" decoding="async"></div>"#,
            esc(&src)
        )
    };
    format!(
        r#"<article class="sake-card">{thumb}<div class="sake-card__body">
<h2 class="sake-card__title">{name}</h2>
<div class="sake-card__meta-top">{pills}</div>
<p class="sake-card__desc">{desc}</p>
{links}</div></article>"#,
        pills = pills_html(item),
        desc = desc_html(&item.desc),
        links = shop_links_html(item),
    )
}

// ── Page ──

pub struct CatalogPage {
    ctx: Rc<AppContext>,
    list: Element,
    status: Element,
    sort: Option<HtmlSelectElement>,
    items: RefCell<Vec<CatalogItem>>,
}

impl CatalogPage {
    fn render(&self) {
        let sort = match &self.sort {
            Some(sel) => CatalogSort::parse(&sel.value()),
            None => Some(CatalogSort::default()),
        };
        let items = sorted_catalog_by(&self.items.borrow(), sort, ja_collation);
        let prefix = &self.ctx.config.image_prefix;
        let html: String = items.iter().map(|item| catalog_card_html(item, prefix)).collect();
        self.list.set_inner_html(&html);
    }

    fn on_list_click(&self, ev: &Event) {
        let Some(btn) = dom::closest(ev, ".sake-card__more-btn") else {
            return;
        };
        let Some(card) = btn.closest(".sake-card").ok().flatten() else {
            return;
        };
        let (Ok(Some(short)), Ok(Some(full))) = (
            card.query_selector(".sake-card__desc-short"),
            card.query_selector(".sake-card__desc-full"),
        ) else {
            return;
        };
        let expand = full.has_attribute("hidden");
        if expand {
            let _ = full.remove_attribute("hidden");
            dom::set_attr(&short, "hidden", "");
        } else {
            dom::set_attr(&full, "hidden", "");
            let _ = short.remove_attribute("hidden");
        }
        dom::set_text(&btn, if expand { LESS } else { MORE });
    }
}

pub async fn init(ctx: Rc<AppContext>) -> Result<(), JsValue> {
    let page = Rc::new(CatalogPage {
        ctx,
        list: dom::get_el!("sake-list"),
        status: dom::get_el!("sake-status"),
        sort: dom::by_id_typed("sortKey"),
        items: RefCell::new(Vec::new()),
    });

    {
        let p = Rc::clone(&page);
        events::listen(&page.list, "click", move |ev| p.on_list_click(&ev))?;
    }
    if let Some(sel) = &page.sort {
        let p = Rc::clone(&page);
        events::listen(sel, "change", move |_| p.render())?;
    }

    dom::set_text(&page.status, MSG_LOADING);
    dom::set_busy(&page.list, true);
    let loaded = load_catalog(&page.ctx.gateway).await;
    dom::set_busy(&page.list, false);
    match loaded {
        Ok(items) if items.is_empty() => {
            page.list.set_inner_html("");
            dom::set_text(&page.status, MSG_EMPTY);
        }
        Ok(items) => {
            let count = items.len();
            *page.items.borrow_mut() = items;
            page.render();
            dom::set_text(&page.status, &status_line(count));
        }
        Err(e) => {
            error!("catalog load failed:", e.to_string());
            dom::set_text(&page.status, MSG_FAILED);
        }
    }
    Ok(())
}
