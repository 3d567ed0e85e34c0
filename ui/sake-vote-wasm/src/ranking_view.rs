//! Ranking markup and collapsible ranking sections.

use crate::dom::{self, esc};
use crate::events;
use crate::state::AppContext;
use gloo_console::error;
use std::cmp::Ordering;
use std::rc::Rc;
use sv_api_types::{ScoreStat, VisualStat};
use sv_core::ranking::updated_at_line;
use sv_core::{BootReport, ListToggle, Podium, RankedEntry, RankingList, RankingView, Session};
use wasm_bindgen::prelude::*;
use web_sys::Element;

pub const MSG_FETCH_FAILED: &str = "取得に失敗しました";
const MSG_EMPTY: &str = "まだ集計データがありません";

// ── Formatting ──

pub fn format_avg(avg: f64) -> String {
    format!("{avg:.2}")
}

/// Browser-local rendering of an ISO timestamp; unparseable input is shown
/// as-is.
pub fn locale_time(raw: &str) -> String {
    let date = js_sys::Date::new(&JsValue::from_str(raw));
    if date.get_time().is_nan() {
        return raw.to_owned();
    }
    date.to_locale_string("ja-JP", &JsValue::UNDEFINED).into()
}

/// `String.prototype.localeCompare` as an `Ordering`.
pub fn locale_collation(a: &str, b: &str) -> Ordering {
    js_sys::JsString::from(a)
        .locale_compare(b, &js_sys::Array::new(), &js_sys::Object::new())
        .cmp(&0)
}

/// `localeCompare` pinned to Japanese, for kana readings.
pub fn ja_collation(a: &str, b: &str) -> Ordering {
    let locales = js_sys::Array::of1(&JsValue::from_str("ja"));
    js_sys::JsString::from(a).locale_compare(b, &locales, &js_sys::Object::new()).cmp(&0)
}

// ── Markup ──

fn item_open<T>(entry: &RankedEntry<T>) -> String {
    let mut class = String::from("rank-item");
    if let Some(top) = entry.medal.css_class() {
        class.push(' ');
        class.push_str(top);
    }
    if entry.hidden {
        class.push_str(" is-hidden");
    }
    format!(
        r#"<li class="{class}"><span class="rank-badge" aria-label="{rank}位">{badge}</span>"#,
        rank = entry.rank + 1,
        badge = entry.medal.badge(),
    )
}

fn name_wrap<T>(entry: &RankedEntry<T>, name: &str, sub: &str) -> String {
    let crown = if entry.medal.has_crown() {
        r#"<span class="crown" aria-hidden="true">👑</span>"#
    } else {
        ""
    };
    let sub = if sub.is_empty() {
        String::new()
    } else {
        format!(r#"<small class="rank-sub">{sub}</small>"#)
    };
    format!(
        r#"<div class="rank-name-wrap">{crown}<span class="rank-name">{}</span>{sub}</div>"#,
        esc(name)
    )
}

fn score_sub(stat: &ScoreStat) -> String {
    let mut sub = String::new();
    if let Some(category) = &stat.category {
        sub.push_str(&format!("【{}】", esc(category)));
    }
    if let Some(brewery) = &stat.brewery {
        sub.push('　');
        sub.push_str(&esc(brewery));
    }
    sub
}

fn empty_item() -> String {
    format!(r#"<li class="rank-item empty">{MSG_EMPTY}</li>"#)
}

pub fn score_items_html(view: &RankingView<ScoreStat>) -> String {
    if view.is_empty() {
        return empty_item();
    }
    view.entries
        .iter()
        .map(|entry| {
            let stat = &entry.record;
            format!(
                r#"{}{}<div class="rank-score"><span class="avg">{}</span><small class="count">（{} 票）</small></div></li>"#,
                item_open(entry),
                name_wrap(entry, &stat.name, &score_sub(stat)),
                format_avg(stat.avg),
                stat.count,
            )
        })
        .collect()
}

pub fn visual_items_html(view: &RankingView<VisualStat>) -> String {
    if view.is_empty() {
        return empty_item();
    }
    view.entries
        .iter()
        .map(|entry| {
            let stat = &entry.record;
            format!(
                r#"{}{}<div class="rank-score"><span class="avg">{}</span><small class="count">票</small></div></li>"#,
                item_open(entry),
                name_wrap(entry, &stat.name, ""),
                stat.votes,
            )
        })
        .collect()
}

pub fn toggle_html(toggle: &ListToggle) -> String {
    format!(
        r#"<button type="button" class="btn list-toggle" aria-expanded="{}">{}</button>"#,
        toggle.expanded,
        toggle.label()
    )
}

/// Top-3 list on the voting page.
pub fn podium_html(podium: &Podium) -> String {
    match podium {
        Podium::Ranked(entries) => entries
            .iter()
            .map(|entry| {
                let stat = &entry.record;
                format!(
                    "<li>{} <strong>{}</strong> — 平均 <strong>{}</strong> 点（{}票）</li>",
                    entry.medal.badge(),
                    esc(&stat.name),
                    format_avg(stat.avg),
                    stat.count,
                )
            })
            .collect(),
        other => format!("<li>{}</li>", other.empty_message().unwrap_or_default()),
    }
}

// ── Sections ──

/// A ranking list with its meta line and optional expand toggle.
pub struct RankingSection {
    kind: RankingList,
    list: Element,
    meta: Option<Element>,
    toggle_wrap: Option<Element>,
}

impl RankingSection {
    pub fn bind(
        kind: RankingList,
        list_id: &str,
        meta_id: &str,
        toggle_wrap_id: &str,
    ) -> Result<Self, JsValue> {
        Ok(Self {
            kind,
            list: dom::get_el!(list_id),
            meta: dom::by_id(meta_id),
            toggle_wrap: dom::by_id(toggle_wrap_id),
        })
    }

    pub fn set_busy(&self, busy: bool) {
        dom::set_busy(&self.list, busy);
    }

    pub fn render(&self, session: &Session) {
        let (items, toggle, updated_at) = match self.kind {
            RankingList::Scores => {
                let view = session.score_view();
                (score_items_html(&view), view.toggle, session.stats_updated_at())
            }
            RankingList::Visual => {
                let view = session.visual_view_by(locale_collation);
                (visual_items_html(&view), view.toggle, session.visual_updated_at())
            }
        };
        self.list.set_inner_html(&items);

        if let Some(wrap) = &self.toggle_wrap {
            match toggle {
                Some(toggle) => {
                    wrap.set_inner_html(&toggle_html(&toggle));
                    dom::remove_class(wrap, "is-hidden");
                }
                None => {
                    wrap.set_inner_html("");
                    dom::add_class(wrap, "is-hidden");
                }
            }
        }
        if let Some(meta) = &self.meta {
            let line =
                updated_at.map(|t| updated_at_line(&locale_time(t))).unwrap_or_default();
            dom::set_text(meta, &line);
        }
    }

    pub fn show_failure(&self) {
        self.list
            .set_inner_html(&format!(r#"<li class="rank-item error">{MSG_FETCH_FAILED}</li>"#));
        if let Some(wrap) = &self.toggle_wrap {
            wrap.set_inner_html("");
            dom::add_class(wrap, "is-hidden");
        }
    }

    /// Initial draw: the failure state when this list could not be loaded.
    pub fn render_boot(&self, session: &Session, report: &BootReport) {
        match report.failed(self.kind) {
            Some(e) => {
                error!("ranking load failed:", e.to_string());
                self.show_failure();
            }
            None => self.render(session),
        }
    }

    /// Delegated click on the toggle wrapper: flip expansion and re-render.
    pub fn bind_toggle(self: &Rc<Self>, ctx: &Rc<AppContext>) -> Result<(), JsValue> {
        let Some(wrap) = &self.toggle_wrap else {
            return Ok(());
        };
        let section = Rc::clone(self);
        let ctx = Rc::clone(ctx);
        events::listen(wrap, "click", move |ev| {
            if dom::closest(&ev, ".list-toggle").is_none() {
                return;
            }
            ctx.session.borrow_mut().toggle_expanded(section.kind);
            section.render(&ctx.session.borrow());
        })
    }
}
