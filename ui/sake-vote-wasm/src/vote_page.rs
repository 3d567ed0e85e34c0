//! Voting page: voter selection, sake cards, star input and submission.

use crate::dom::{self, esc};
use crate::events::{self, on_click, on_click_async};
use crate::ranking_view::{locale_time, podium_html};
use crate::state::{self, AppContext, VOTER_KEY};
use futures::join;
use gloo_console::{error, warn};
use std::rc::Rc;
use sv_api_types::SakeItem;
use sv_core::error::MSG_VOTING_CLOSED;
use sv_core::ranking::updated_at_line;
use sv_core::store::parse_sake_key;
use sv_core::{
    Affordances, MAX_SCORE, RankingList, Surface, VoteError, VoteStore, arrow_delta, bootstrap,
    refresh_gate, refresh_stats, sake_key, submit_ballot,
};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event, HtmlButtonElement, HtmlElement, HtmlSelectElement, KeyboardEvent};

const MSG_LOAD_FAILED: &str = "銘柄データの読み込みに失敗しました。リロードしてください。";
const MSG_STATS_FAILED: &str = "集計の取得に失敗しました。時間をおいて再試行してください。";
const MSG_SENDING: &str = "送信中...";
const MSG_SENT: &str = "送信しました。最新の集計を反映します。";
const MSG_ITEM_CLEARED: &str = "入力をリセットしました。";
const MSG_ALL_CLEARED: &str = "全ての評価をリセットしました。";
const MSG_SELF_VISUAL: &str = "出品者はビジュアル投票できません。";
const SELF_VOTE_TITLE: &str = "出品者は自己投票できません";
const MEMBER_PLACEHOLDER: &str = "選択してください";
/// Characters of a blurred description left readable.
const BLUR_CLEAR_CHARS: usize = 20;

// ── Elements ──

pub struct Elements {
    pub nickname: HtmlSelectElement,
    pub nickname_confirm: Option<HtmlSelectElement>,
    pub selected_name: Option<Element>,
    pub sake_list: Element,
    pub send_btn: HtmlButtonElement,
    pub clear_btn: HtmlButtonElement,
    pub refresh_btn: HtmlButtonElement,
    pub msg: Element,
    pub ranking: Element,
    pub meta: Option<Element>,
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            nickname: dom::get_select!("nickname"),
            nickname_confirm: dom::by_id_typed("nicknameConfirm"),
            selected_name: dom::by_id("selectedName"),
            sake_list: dom::get_el!("sake-list"),
            send_btn: dom::get_button!("sendBtn"),
            clear_btn: dom::get_button!("clearBtn"),
            refresh_btn: dom::get_button!("refreshBtn"),
            msg: dom::get_el!("msg"),
            ranking: dom::get_el!("ranking"),
            meta: dom::by_id("meta"),
        })
    }

    fn voter_selects(&self) -> impl Iterator<Item = &HtmlSelectElement> {
        std::iter::once(&self.nickname).chain(self.nickname_confirm.iter())
    }
}

// ── Markup ──

fn desc_html(item: &SakeItem) -> String {
    if !item.blur {
        return esc(&item.desc);
    }
    let split =
        item.desc.char_indices().nth(BLUR_CLEAR_CHARS).map_or(item.desc.len(), |(i, _)| i);
    let (clear, blurred) = item.desc.split_at(split);
    format!(
        r#"<span class="clear">{}</span><span class="blurred">{}</span>"#,
        esc(clear),
        esc(blurred)
    )
}

fn pills_html(item: &SakeItem) -> String {
    let mut pills = String::new();
    if let Some(category) = &item.category {
        pills.push_str(&format!(r#"<span class="pill">【{}】</span>"#, esc(category)));
    }
    if let Some(brewery) = &item.brewery {
        match &item.brewery_url {
            Some(url) => pills.push_str(&format!(
                r#"<a href="{}" class="pill link" target="_blank" rel="noopener noreferrer">{}</a>"#,
                esc(url),
                esc(brewery)
            )),
            None => pills.push_str(&format!(r#"<span class="pill">{}</span>"#, esc(brewery))),
        }
    }
    if let Some(exhibitor) = &item.exhibitor {
        pills.push_str(&format!(r#"<span class="pill">出品者：{}</span>"#, esc(exhibitor)));
    }
    pills
}

fn stars_html(key: &str) -> String {
    (1..=MAX_SCORE)
        .map(|v| {
            format!(
                r#"<span class="star" role="radio" tabindex="0" aria-checked="false" data-key="{key}" data-value="{v}" aria-label="{v} 点">★</span>"#
            )
        })
        .collect()
}

/// One sake card. Dynamic state (stars, exclusion, visual pick) is applied
/// afterwards by `VotePage::sync_ui`.
pub fn card_html(idx: usize, item: &SakeItem, image_prefix: &str) -> String {
    let key = sake_key(idx);
    let name = esc(&item.name);
    let src = esc(&dom::resolve_image_src(&item.img, image_prefix));
    format!(
        r#"<div class="item" data-index="{idx}">
<img class="thumb" src="{src}" alt="{name}" loading="lazy" decoding="async">
<div class="body">
<h3>{num}. {name}</h3>
<div class="meta-row">{pills}</div>
<p class="desc clamp" data-desc="{key}">{desc}</p>
<button class="more-btn" type="button" data-more="{key}">続きを読む</button>
<div class="star-row" data-row="{key}">
<div class="stars" role="radiogroup" aria-label="{name} の評価（0〜10）">{stars}</div>
<div class="scale-labels" aria-hidden="true"><span class="label-min">1</span><span class="label-mid">5</span><span class="label-max">10</span></div>
</div>
<div class="clear-wrap"><button class="clear-mini" type="button" data-clear="{key}" aria-label="この銘柄の評価をクリア">クリア</button></div>
</div>
</div>"#,
        num = idx + 1,
        pills = pills_html(item),
        desc = desc_html(item),
        stars = stars_html(&key),
    )
}

fn attr_index(el: &Element, attr: &str) -> Option<usize> {
    el.get_attribute(attr).as_deref().and_then(parse_sake_key)
}

fn star_value(star: &Element) -> Option<u8> {
    star.get_attribute("data-value")?.parse().ok()
}

/// Control state of one card, derived in the same pass for every input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CardState {
    excluded: bool,
    score: u8,
    visual_selected: bool,
    stars_inert: bool,
    thumb_inert: bool,
}

impl CardState {
    fn of(affordances: Affordances, store: &VoteStore, idx: usize) -> Self {
        let excluded = store.is_excluded(idx);
        Self {
            excluded,
            score: store.score(idx),
            visual_selected: store.visual() == Some(idx),
            stars_inert: excluded || !affordances.stars_enabled,
            thumb_inert: excluded || !affordances.visual_enabled,
        }
    }
}

fn flag(on: bool) -> &'static str {
    if on { "true" } else { "false" }
}

// ── Page ──

pub struct VotePage {
    ctx: Rc<AppContext>,
    els: Elements,
}

impl VotePage {
    fn show(&self, text: &str, error: bool) {
        dom::set_msg(&self.els.msg, text, error);
    }

    fn fill_members(&self) -> Result<(), JsValue> {
        let session = self.ctx.session.borrow();
        for sel in self.els.voter_selects() {
            let options = session.members().iter().map(|m| (m.key(), m.name.as_str()));
            dom::fill_select(sel, MEMBER_PLACEHOLDER, options)?;
        }
        Ok(())
    }

    fn render_cards(&self) {
        let session = self.ctx.session.borrow();
        let prefix = &self.ctx.config.image_prefix;
        let html: String = session
            .sakes()
            .iter()
            .enumerate()
            .map(|(idx, item)| card_html(idx, item, prefix))
            .collect();
        self.els.sake_list.set_inner_html(&html);
    }

    fn render_podium(&self) {
        let session = self.ctx.session.borrow();
        self.els.ranking.set_inner_html(&podium_html(&session.podium()));
        if let Some(meta) = &self.els.meta {
            let line = session
                .stats_updated_at()
                .map(|t| updated_at_line(&locale_time(t)))
                .unwrap_or_default();
            dom::set_text(meta, &line);
        }
    }

    /// Apply the session to every dynamic control in one pass.
    fn sync_ui(&self) {
        let session = self.ctx.session.borrow();
        let affordances = session.affordances();
        let store = session.store();

        dom::toggle_class(&self.els.sake_list, "visual-disabled", !affordances.visual_enabled);
        for card in dom::query_all_within(&self.els.sake_list, ".item") {
            let Some(idx) = card.get_attribute("data-index").and_then(|v| v.parse().ok()) else {
                continue;
            };
            let state = CardState::of(affordances, store, idx);
            let (excluded, score) = (state.excluded, state.score);
            dom::toggle_class(&card, "visual-selected", state.visual_selected);
            if excluded {
                dom::set_attr(&card, "data-self-disabled", "true");
                dom::set_attr(&card, "style", "opacity:0.6");
            } else {
                let _ = card.remove_attribute("data-self-disabled");
                let _ = card.remove_attribute("style");
            }
            if let Ok(Some(desc)) = card.query_selector(".desc") {
                if excluded {
                    dom::set_attr(&desc, "title", SELF_VOTE_TITLE);
                } else {
                    let _ = desc.remove_attribute("title");
                }
            }

            if let Ok(Some(thumb)) = card.query_selector(".thumb") {
                dom::toggle_class(&thumb, "disabled", state.thumb_inert);
                dom::set_attr(&thumb, "aria-disabled", flag(state.thumb_inert));
            }
            for star in dom::query_all_within(&card, ".star") {
                let value = star_value(&star).unwrap_or(0);
                dom::toggle_class(&star, "active", value <= score);
                dom::set_attr(&star, "aria-checked", flag(value == score));
                dom::set_attr(&star, "aria-disabled", flag(state.stars_inert));
                dom::set_attr(&star, "tabindex", if state.stars_inert { "-1" } else { "0" });
            }
        }

        self.els.send_btn.set_disabled(!affordances.submit_enabled);
        dom::set_busy(&self.els.send_btn, affordances.busy);

        let msg = self.els.msg.text_content().unwrap_or_default();
        if affordances.closed_notice {
            self.show(MSG_VOTING_CLOSED, true);
        } else if msg == MSG_VOTING_CLOSED {
            self.show("", false);
        }
    }

    fn apply_voter(&self, key: &str) {
        for sel in self.els.voter_selects() {
            sel.set_value(key);
        }
        let excluded = self.ctx.session.borrow_mut().select_voter(key);
        if let Some(label) = &self.els.selected_name {
            dom::set_text(label, self.ctx.session.borrow().voter_label());
        }
        if !excluded.is_empty() {
            gloo_console::log!("own exhibits locked:", excluded.len() as u32);
        }
        state::local_set(VOTER_KEY, key);
        self.sync_ui();
    }

    fn restore_voter(&self) {
        let Some(saved) = state::local_get(VOTER_KEY) else {
            return;
        };
        let known = self.ctx.session.borrow().members().iter().any(|m| m.key() == saved);
        if known {
            self.apply_voter(&saved);
        }
    }

    /// Surface an edit failure; successful edits only need a re-sync.
    fn after_edit<T>(&self, result: Result<T, VoteError>) {
        if let Err(e) = result {
            self.show(&e.user_message(), true);
        }
        self.sync_ui();
    }

    // ── Handlers ──

    fn on_list_click(&self, ev: &Event) {
        if let Some(star) = dom::closest(ev, ".star") {
            let (Some(idx), Some(value)) = (attr_index(&star, "data-key"), star_value(&star))
            else {
                return;
            };
            let result = self.ctx.session.borrow_mut().click_star(idx, value);
            self.after_edit(result);
        } else if let Some(btn) = dom::closest(ev, "[data-clear]") {
            let Some(idx) = attr_index(&btn, "data-clear") else {
                return;
            };
            let result = self.ctx.session.borrow_mut().clear_item(idx);
            if result.is_ok() {
                self.show(MSG_ITEM_CLEARED, false);
            }
            self.after_edit(result);
        } else if let Some(btn) = dom::closest(ev, "[data-more]") {
            let Some(key) = btn.get_attribute("data-more") else {
                return;
            };
            let selector = format!(r#"[data-desc="{key}"]"#);
            if let Ok(Some(desc)) = self.els.sake_list.query_selector(&selector) {
                let clamped = dom::has_class(&desc, "clamp");
                dom::toggle_class(&desc, "clamp", !clamped);
                dom::set_text(&btn, if clamped { "閉じる" } else { "続きを読む" });
            }
        } else if let Some(thumb) = dom::closest(ev, ".thumb") {
            let Some(idx) = thumb
                .closest(".item")
                .ok()
                .flatten()
                .and_then(|card| card.get_attribute("data-index"))
                .and_then(|v| v.parse().ok())
            else {
                return;
            };
            let result = self.ctx.session.borrow_mut().toggle_visual(idx);
            match result {
                Err(VoteError::SelfVote(_)) => {
                    self.show(MSG_SELF_VISUAL, true);
                    self.sync_ui();
                }
                other => self.after_edit(other),
            }
        }
    }

    fn on_list_keydown(&self, ev: &Event) {
        let Some(star) = dom::closest(ev, ".star") else {
            return;
        };
        let Some(key) = ev.dyn_ref::<KeyboardEvent>().map(KeyboardEvent::key) else {
            return;
        };
        let (Some(idx), Some(value)) = (attr_index(&star, "data-key"), star_value(&star)) else {
            return;
        };
        let result = if let Some(delta) = arrow_delta(&key) {
            self.ctx.session.borrow_mut().key_star(idx, delta)
        } else if key == "Enter" || key == " " {
            self.ctx.session.borrow_mut().click_star(idx, value)
        } else {
            return;
        };
        ev.prevent_default();

        let focus_value = result.as_ref().ok().map(|&score| score.max(1));
        self.after_edit(result);
        if let (Some(v), Some(group)) = (focus_value, star.parent_element()) {
            let target = group
                .query_selector(&format!(r#"[data-value="{v}"]"#))
                .ok()
                .flatten()
                .and_then(|el| el.dyn_into::<HtmlElement>().ok());
            if let Some(target) = target {
                let _ = target.focus();
            }
        }
    }

    fn on_clear(&self) {
        self.ctx.session.borrow_mut().clear_ballot();
        self.show(MSG_ALL_CLEARED, false);
        self.sync_ui();
    }
}

async fn on_send(page: Rc<VotePage>) {
    if page.ctx.session.borrow().is_submitting() {
        return;
    }
    page.els.send_btn.set_disabled(true);
    dom::set_busy(&page.els.send_btn, true);
    page.show(MSG_SENDING, false);

    match submit_ballot(&page.ctx.session, &page.ctx.gateway).await {
        Ok(receipt) => {
            page.show(MSG_SENT, false);
            match receipt.refresh_error {
                Some(e) => {
                    error!("stats refresh after submit failed:", e.to_string());
                    page.show(MSG_STATS_FAILED, true);
                }
                None => page.render_podium(),
            }
        }
        Err(VoteError::AlreadySubmitting) => return,
        Err(e) => {
            if !e.is_local() {
                error!("submit failed:", e.to_string());
            }
            page.show(&e.user_message(), true);
        }
    }
    page.sync_ui();
}

async fn on_refresh(page: Rc<VotePage>) {
    dom::set_busy(&page.els.ranking, true);
    let (stats, gate) = join!(
        refresh_stats(&page.ctx.session, &page.ctx.gateway),
        refresh_gate(&page.ctx.session, &page.ctx.gateway)
    );
    dom::set_busy(&page.els.ranking, false);
    if let Some(e) = gate.error {
        warn!("settings load failed:", e.to_string());
    }
    match stats {
        Ok(()) => page.render_podium(),
        Err(e) => {
            error!("stats refresh failed:", e.to_string());
            page.show(MSG_STATS_FAILED, true);
        }
    }
    page.sync_ui();
}

fn bind_events(page: &Rc<VotePage>) -> Result<(), JsValue> {
    on_click_async!(page.els.send_btn, page, on_send);
    on_click_async!(page.els.refresh_btn, page, on_refresh);
    {
        let p = Rc::clone(page);
        on_click!(page.els.clear_btn, move |_| p.on_clear());
    }
    {
        let p = Rc::clone(page);
        events::listen(&page.els.sake_list, "click", move |ev| p.on_list_click(&ev))?;
    }
    {
        let p = Rc::clone(page);
        events::listen(&page.els.sake_list, "keydown", move |ev| p.on_list_keydown(&ev))?;
    }
    for sel in page.els.voter_selects() {
        let p = Rc::clone(page);
        let source = sel.clone();
        events::listen(sel, "change", move |_| p.apply_voter(&source.value()))?;
    }
    Ok(())
}

pub async fn init(ctx: Rc<AppContext>) -> Result<(), JsValue> {
    let page = Rc::new(VotePage { ctx, els: Elements::bind()? });
    dom::set_busy(&page.els.sake_list, true);
    dom::set_busy(&page.els.ranking, true);
    let boot = bootstrap(&page.ctx.session, &page.ctx.gateway, Surface::Voting).await;
    dom::set_busy(&page.els.sake_list, false);
    dom::set_busy(&page.els.ranking, false);

    let report = match boot {
        Ok(report) => report,
        Err(e) => {
            error!("initial load failed:", e.to_string());
            page.show(MSG_LOAD_FAILED, true);
            return Ok(());
        }
    };

    page.fill_members()?;
    page.render_cards();
    page.render_podium();
    bind_events(&page)?;
    if let Some(e) = &report.gate.error {
        warn!("settings load failed:", e.to_string());
    }
    match report.failed(RankingList::Scores) {
        None => page.show("", false),
        Some(e) => {
            error!("stats load failed:", e.to_string());
            page.show(MSG_STATS_FAILED, true);
        }
    }
    page.restore_voter();
    page.sync_ui();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> SakeItem {
        SakeItem {
            name: "獺祭 <45>".into(),
            category: Some("純米大吟醸".into()),
            brewery: Some("旭酒造".into()),
            brewery_url: Some("https://asahishuzo.example/".into()),
            exhibitor: Some("Aki".into()),
            desc: "山口県の酒".into(),
            img: "images/dassai.jpg".into(),
            ..SakeItem::default()
        }
    }

    #[test]
    fn card_carries_keys_and_ten_stars() {
        let html = card_html(2, &item(), "../");
        assert!(html.contains(r#"<div class="item" data-index="2">"#));
        assert!(html.contains("<h3>3. 獺祭 &lt;45&gt;</h3>"));
        assert!(html.contains(r#"src="../images/dassai.jpg""#));
        assert!(html.contains(r#"data-desc="s2""#));
        assert!(html.contains(r#"data-clear="s2""#));
        assert_eq!(html.matches(r#"class="star""#).count(), 10);
        assert!(html.contains(r#"data-key="s2" data-value="10" aria-label="10 点""#));
    }

    #[test]
    fn card_pills_link_the_brewery() {
        let html = card_html(0, &item(), "../");
        assert!(html.contains(r#"<span class="pill">【純米大吟醸】</span>"#));
        assert!(html.contains(r#"href="https://asahishuzo.example/" class="pill link""#));
        assert!(html.contains(r#"<span class="pill">出品者：Aki</span>"#));

        let plain = SakeItem { brewery_url: None, exhibitor: None, ..item() };
        let html = card_html(0, &plain, "../");
        assert!(html.contains(r#"<span class="pill">旭酒造</span>"#));
        assert!(!html.contains("出品者"));
    }

    #[test]
    fn blurred_description_keeps_first_twenty_chars_clear() {
        let desc: String = "あ".repeat(25);
        let item = SakeItem { desc, blur: true, ..SakeItem::default() };
        let html = desc_html(&item);
        assert_eq!(
            html,
            format!(
                r#"<span class="clear">{}</span><span class="blurred">{}</span>"#,
                "あ".repeat(20),
                "あ".repeat(5)
            )
        );

        let short = SakeItem { desc: "短い".into(), blur: true, ..SakeItem::default() };
        assert_eq!(
            desc_html(&short),
            r#"<span class="clear">短い</span><span class="blurred"></span>"#
        );
    }

    #[test]
    fn thumbs_follow_visual_channel_and_exclusion() {
        let items: Vec<SakeItem> = ["m1", "m2"]
            .iter()
            .map(|id| SakeItem { exhibitor_member_id: Some((*id).into()), ..SakeItem::default() })
            .collect();
        let mut store = VoteStore::new(items.len());
        store.apply_voter(Some("m1"), &items);
        store.set_score(1, 6).unwrap();
        let open = Affordances {
            submit_enabled: true,
            stars_enabled: true,
            visual_enabled: true,
            closed_notice: false,
            busy: false,
        };

        let own = CardState::of(open, &store, 0);
        assert!(own.excluded && own.thumb_inert && own.stars_inert);

        let other = CardState::of(open, &store, 1);
        assert_eq!((other.score, other.thumb_inert, other.stars_inert), (6, false, false));

        let no_visual = Affordances { visual_enabled: false, ..open };
        let other = CardState::of(no_visual, &store, 1);
        assert!(other.thumb_inert);
        assert!(!other.stars_inert);
    }

    #[test]
    fn plain_description_is_escaped() {
        let item = SakeItem { desc: "a & b".into(), ..SakeItem::default() };
        assert_eq!(desc_html(&item), "a &amp; b");
    }
}
