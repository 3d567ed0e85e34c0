//! Admin page: voting-open toggle, channel settings and live rankings.

use crate::dom;
use crate::events::{self, on_click_async};
use crate::ranking_view::{MSG_FETCH_FAILED, RankingSection};
use crate::state::AppContext;
use gloo_console::{error, warn};
use std::rc::Rc;
use sv_core::{
    Channels, RankingList, Surface, VoteError, bootstrap, refresh_stats, refresh_visual_stats,
    save_settings, toggle_open,
};
use wasm_bindgen::prelude::*;
use web_sys::{Element, HtmlButtonElement, HtmlInputElement, HtmlSelectElement};

const MSG_TOGGLING: &str = "切り替え中...";
const MSG_TOGGLED: &str = "受付状態を更新しました。";
const MSG_SAVING: &str = "保存中...";
const MSG_SAVED: &str = "設定を保存しました。";
const MSG_SETTINGS_FAILED: &str = "受付状態の取得に失敗しました。";
const ADMIN_PLACEHOLDER: &str = "管理者を選択してください";

/// Settings timestamp as the sheet stores it.
fn settings_updated_line(raw: Option<&str>) -> String {
    format!("最終更新：{}", raw.unwrap_or("-"))
}

/// Server text when there is any, the local message otherwise.
fn failure_detail(e: &VoteError) -> String {
    match e {
        VoteError::HttpStatus { raw, .. }
        | VoteError::MalformedResponse { raw }
        | VoteError::ServerRejected { raw } => raw.clone(),
        other => other.user_message(),
    }
}

// ── Elements ──

/// Optional channel settings form.
pub struct SettingsPanel {
    pub member: HtmlSelectElement,
    pub allow_sake: HtmlInputElement,
    pub allow_visual: HtmlInputElement,
    pub save_btn: HtmlButtonElement,
}

impl SettingsPanel {
    fn bind() -> Result<Option<Self>, JsValue> {
        if dom::by_id("adminMember").is_none() {
            return Ok(None);
        }
        let checkbox = |id: &str| {
            dom::by_id_typed::<HtmlInputElement>(id)
                .ok_or_else(|| JsValue::from_str(&format!("missing checkbox #{id}")))
        };
        Ok(Some(Self {
            member: dom::get_select!("adminMember"),
            allow_sake: checkbox("allowSakeVote")?,
            allow_visual: checkbox("allowVisualVote")?,
            save_btn: dom::get_button!("saveSettingsBtn"),
        }))
    }

    fn channels(&self) -> Channels {
        Channels { sake: self.allow_sake.checked(), visual: self.allow_visual.checked() }
    }
}

pub struct Elements {
    pub toggle_btn: HtmlButtonElement,
    pub vote_open_label: Element,
    pub admin_msg: Element,
    pub settings_updated: Option<Element>,
    pub refresh_stats_btn: Option<HtmlButtonElement>,
    pub refresh_visual_btn: Option<HtmlButtonElement>,
    pub settings: Option<SettingsPanel>,
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            toggle_btn: dom::get_button!("toggleBtn"),
            vote_open_label: dom::get_el!("voteOpenLabel"),
            admin_msg: dom::get_el!("adminMsg"),
            settings_updated: dom::by_id("settingsUpdated"),
            refresh_stats_btn: dom::by_id_typed("refreshStatsBtn"),
            refresh_visual_btn: dom::by_id_typed("refreshVisualBtn"),
            settings: SettingsPanel::bind()?,
        })
    }
}

// ── Page ──

pub struct AdminPage {
    ctx: Rc<AppContext>,
    els: Elements,
    scores: Rc<RankingSection>,
    visual: Rc<RankingSection>,
}

impl AdminPage {
    fn show(&self, text: &str, error: bool) {
        dom::set_msg(&self.els.admin_msg, text, error);
    }

    fn render_gate(&self) {
        let session = self.ctx.session.borrow();
        let state = session.gate().state();
        let label = &self.els.vote_open_label;
        dom::set_text(label, state.label());
        dom::toggle_class(label, "is-open", state.is_open());
        dom::toggle_class(label, "is-closed", !state.is_open());
        dom::set_text(&self.els.toggle_btn, state.toggle_label());
        self.els.toggle_btn.set_disabled(session.is_saving());
        if let Some(el) = &self.els.settings_updated {
            dom::set_text(el, &settings_updated_line(session.gate().last_updated()));
        }

        if let Some(panel) = &self.els.settings {
            let channels = session.gate().channels();
            panel.allow_sake.set_checked(channels.sake);
            panel.allow_visual.set_checked(channels.visual);
            panel.save_btn.set_disabled(session.is_saving() || !session.is_admin_selected());
        }
    }

    fn fill_admins(&self) -> Result<(), JsValue> {
        let Some(panel) = &self.els.settings else {
            return Ok(());
        };
        let session = self.ctx.session.borrow();
        let admins = session.members().iter().filter(|m| m.is_admin());
        let options = admins.map(|m| (m.key(), m.name.as_str()));
        dom::fill_select(&panel.member, ADMIN_PLACEHOLDER, options)
    }

    fn on_admin_change(&self, key: &str) {
        self.ctx.session.borrow_mut().select_voter(key);
        self.render_gate();
    }
}

async fn on_toggle(page: Rc<AdminPage>) {
    if page.ctx.session.borrow().is_saving() {
        return;
    }
    page.els.toggle_btn.set_disabled(true);
    page.show(MSG_TOGGLING, false);

    match toggle_open(&page.ctx.session, &page.ctx.gateway).await {
        Ok(refresh) => match refresh.error {
            None => page.show(MSG_TOGGLED, false),
            Some(e) => {
                warn!("settings reload failed:", e.to_string());
                page.show(MSG_SETTINGS_FAILED, true);
            }
        },
        Err(VoteError::AlreadySubmitting) => {}
        Err(e) => {
            error!("toggle_open failed:", e.to_string());
            page.show(&format!("更新に失敗しました：{}", failure_detail(&e)), true);
        }
    }
    page.render_gate();
}

async fn on_save_settings(page: Rc<AdminPage>) {
    let Some(panel) = &page.els.settings else {
        return;
    };
    let channels = panel.channels();
    panel.save_btn.set_disabled(true);
    page.show(MSG_SAVING, false);

    match save_settings(&page.ctx.session, &page.ctx.gateway, channels).await {
        Ok(refresh) => match refresh.error {
            None => page.show(MSG_SAVED, false),
            Some(e) => {
                warn!("settings reload failed:", e.to_string());
                page.show(MSG_SETTINGS_FAILED, true);
            }
        },
        Err(VoteError::AlreadySubmitting) => {}
        Err(e) if e.is_local() => page.show(&e.user_message(), true),
        Err(e) => {
            error!("updateSettings failed:", e.to_string());
            page.show(&format!("更新に失敗しました：{}", failure_detail(&e)), true);
        }
    }
    page.render_gate();
}

async fn on_refresh_stats(page: Rc<AdminPage>) {
    page.scores.set_busy(true);
    let result = refresh_stats(&page.ctx.session, &page.ctx.gateway).await;
    page.scores.set_busy(false);
    match result {
        Ok(()) => page.scores.render(&page.ctx.session.borrow()),
        Err(e) => {
            error!("stats refresh failed:", e.to_string());
            page.scores.show_failure();
        }
    }
}

async fn on_refresh_visual(page: Rc<AdminPage>) {
    page.visual.set_busy(true);
    let result = refresh_visual_stats(&page.ctx.session, &page.ctx.gateway).await;
    page.visual.set_busy(false);
    match result {
        Ok(()) => page.visual.render(&page.ctx.session.borrow()),
        Err(e) => {
            error!("visual stats refresh failed:", e.to_string());
            page.visual.show_failure();
        }
    }
}

fn bind_events(page: &Rc<AdminPage>) -> Result<(), JsValue> {
    on_click_async!(page.els.toggle_btn, page, on_toggle);
    if let Some(btn) = &page.els.refresh_stats_btn {
        on_click_async!(btn, page, on_refresh_stats);
    }
    if let Some(btn) = &page.els.refresh_visual_btn {
        on_click_async!(btn, page, on_refresh_visual);
    }
    if let Some(panel) = &page.els.settings {
        on_click_async!(panel.save_btn, page, on_save_settings);
        let p = Rc::clone(page);
        let select = panel.member.clone();
        events::listen(&panel.member, "change", move |_| p.on_admin_change(&select.value()))?;
    }
    page.scores.bind_toggle(&page.ctx)?;
    page.visual.bind_toggle(&page.ctx)?;
    Ok(())
}

pub async fn init(ctx: Rc<AppContext>) -> Result<(), JsValue> {
    let page = Rc::new(AdminPage {
        ctx,
        els: Elements::bind()?,
        scores: Rc::new(RankingSection::bind(
            RankingList::Scores,
            "rankList",
            "rankMeta",
            "rankToggleWrap",
        )?),
        visual: Rc::new(RankingSection::bind(
            RankingList::Visual,
            "visualList",
            "visualMeta",
            "visualToggleWrap",
        )?),
    });
    page.scores.set_busy(true);
    page.visual.set_busy(true);
    let boot = bootstrap(&page.ctx.session, &page.ctx.gateway, Surface::Admin).await;
    page.scores.set_busy(false);
    page.visual.set_busy(false);

    match boot {
        Ok(report) => {
            page.fill_admins()?;
            {
                let session = page.ctx.session.borrow();
                page.scores.render_boot(&session, &report);
                page.visual.render_boot(&session, &report);
            }
            if let Some(e) = &report.gate.error {
                warn!("settings load failed:", e.to_string());
                page.show(MSG_SETTINGS_FAILED, true);
            } else if !report.problems.is_empty() {
                page.show(MSG_FETCH_FAILED, true);
            }
        }
        Err(e) => {
            error!("initial load failed:", e.to_string());
            page.show(MSG_FETCH_FAILED, true);
            page.scores.show_failure();
            page.visual.show_failure();
        }
    }
    page.render_gate();
    bind_events(&page)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_detail_prefers_server_text() {
        let rejected = VoteError::ServerRejected { raw: "member not admin".into() };
        assert_eq!(failure_detail(&rejected), "member not admin");

        let http = VoteError::HttpStatus { status: 500, raw: "boom".into() };
        assert_eq!(failure_detail(&http), "boom");

        assert_eq!(failure_detail(&VoteError::NotAdmin("Aki".into())), "権限がありません。");
    }

    #[test]
    fn settings_timestamp_falls_back_to_dash() {
        assert_eq!(settings_updated_line(Some("2025/10/18 14:00")), "最終更新：2025/10/18 14:00");
        assert_eq!(settings_updated_line(None), "最終更新：-");
    }
}
