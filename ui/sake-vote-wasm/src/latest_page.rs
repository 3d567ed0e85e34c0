//! Latest published round: top-3 cards and the bottle design award.

use crate::dom::{self, esc};
use crate::state::AppContext;
use gloo_console::error;
use std::rc::Rc;
use sv_api_types::AwardEntry;
use sv_core::catalog::{award_medal, award_meta, brewery_line};
use sv_core::{LatestResult, Medal, load_latest};
use wasm_bindgen::prelude::*;
use web_sys::Element;

const MSG_LOADING: &str = "最新の結果を読み込んでいます…";
const MSG_NO_RESULT: &str = "最新回の結果がまだ登録されていません。";
const MSG_FAILED: &str = "最新の結果の取得に失敗しました。時間をおいて再度お試しください。";
const DESIGN_AWARD: &str = "ボトルデザイン賞";

// ── Markup ──

fn external_link(url: Option<&str>, inner: &str) -> String {
    match url {
        Some(url) => format!(
            r#"<a href="{}" target="_blank" rel="noopener noreferrer">{inner}</a>"#,
            esc(url)
        ),
        None => inner.to_owned(),
    }
}

/// Photo linked to `link`, or nothing when the entry has no image.
fn photo_html(entry: &AwardEntry, link: Option<&str>) -> String {
    let img = entry.img.trim();
    if img.is_empty() {
        return String::new();
    }
    let tag = format!(r#"<img src="{}" alt="{}">"#, esc(img), esc(&entry.name));
    format!(r#"<div class="ranking-card__photo">{}</div>"#, external_link(link, &tag))
}

fn medal_modifier(medal: Option<Medal>) -> &'static str {
    match medal {
        Some(Medal::Gold) => " ranking-card__medal--gold",
        Some(Medal::Silver) => " ranking-card__medal--silver",
        Some(Medal::Bronze) => " ranking-card__medal--bronze",
        _ => "",
    }
}

pub fn award_card_html(entry: &AwardEntry) -> String {
    let sake_url = entry.sake_url.as_deref();
    let brewery = external_link(entry.brewery_url.as_deref(), &esc(&brewery_line(entry)));
    format!(
        r#"<article class="ranking-card"><div class="ranking-card__medal{modifier}">{rank}位</div><div>{photo}<div class="ranking-card__title">{title}</div><div class="ranking-card__brewery">{brewery}</div><div class="ranking-card__meta">{meta}</div></div></article>"#,
        modifier = medal_modifier(award_medal(entry)),
        rank = entry.rank,
        photo = photo_html(entry, sake_url),
        title = external_link(sake_url, &esc(&entry.name)),
        meta = esc(&award_meta(entry)),
    )
}

/// The design award card links its photo to the brewery.
pub fn design_card_html(entry: &AwardEntry) -> String {
    let brewery_url = entry.brewery_url.as_deref();
    let label = entry.award_label.as_deref().unwrap_or(DESIGN_AWARD);
    format!(
        r#"<article class="ranking-card ranking-card--design"><div class="ranking-card__medal ranking-card__medal--design">{label}</div><div>{photo}<div class="ranking-card__title">{title}</div><div class="ranking-card__brewery">{brewery}</div></div></article>"#,
        label = esc(label),
        photo = photo_html(entry, brewery_url),
        title = esc(&entry.name),
        brewery = external_link(brewery_url, &esc(&brewery_line(entry))),
    )
}

// ── Page ──

struct Elements {
    grid: Element,
    status: Element,
    round: Option<Element>,
    design: Option<Element>,
}

impl Elements {
    fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            grid: dom::get_el!("latest-ranking"),
            status: dom::get_el!("latest-status"),
            round: dom::by_id("latest-round"),
            design: dom::by_id("latest-design"),
        })
    }

    fn render(&self, latest: &LatestResult) -> Result<(), JsValue> {
        if let (Some(el), Some(round)) = (&self.round, &latest.round) {
            dom::set_text(el, round);
        }
        if latest.top3.is_empty() {
            self.grid.set_inner_html("");
            dom::set_text(&self.status, MSG_NO_RESULT);
            self.grid.append_child(&self.status)?;
            return Ok(());
        }
        let cards: String = latest.top3.iter().map(award_card_html).collect();
        self.grid.set_inner_html(&cards);
        self.status.remove();
        if let (Some(el), Some(award)) = (&self.design, &latest.design_award) {
            el.set_inner_html(&design_card_html(award));
        }
        Ok(())
    }
}

pub async fn init(ctx: Rc<AppContext>) -> Result<(), JsValue> {
    let els = Elements::bind()?;
    dom::set_text(&els.status, MSG_LOADING);
    match load_latest(&ctx.gateway).await {
        Ok(latest) => els.render(&latest)?,
        Err(e) => {
            error!("latest result load failed:", e.to_string());
            dom::set_text(&els.status, MSG_FAILED);
        }
    }
    Ok(())
}
