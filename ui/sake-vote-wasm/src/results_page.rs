//! Read-only results page: score and visual rankings.

use crate::dom;
use crate::events::on_click_async;
use crate::ranking_view::RankingSection;
use crate::state::AppContext;
use futures::join;
use gloo_console::error;
use std::rc::Rc;
use sv_core::{RankingList, Surface, bootstrap, refresh_stats, refresh_visual_stats};
use wasm_bindgen::prelude::*;
use web_sys::HtmlButtonElement;

pub struct ResultsPage {
    ctx: Rc<AppContext>,
    scores: Rc<RankingSection>,
    visual: Rc<RankingSection>,
    refresh_btn: Option<HtmlButtonElement>,
}

impl ResultsPage {
    fn set_busy(&self, busy: bool) {
        self.scores.set_busy(busy);
        self.visual.set_busy(busy);
    }
}

async fn on_refresh(page: Rc<ResultsPage>) {
    page.set_busy(true);
    let (stats, visual) = join!(
        refresh_stats(&page.ctx.session, &page.ctx.gateway),
        refresh_visual_stats(&page.ctx.session, &page.ctx.gateway)
    );
    page.set_busy(false);

    let session = page.ctx.session.borrow();
    match stats {
        Ok(()) => page.scores.render(&session),
        Err(e) => {
            error!("stats refresh failed:", e.to_string());
            page.scores.show_failure();
        }
    }
    match visual {
        Ok(()) => page.visual.render(&session),
        Err(e) => {
            error!("visual stats refresh failed:", e.to_string());
            page.visual.show_failure();
        }
    }
}

pub async fn init(ctx: Rc<AppContext>) -> Result<(), JsValue> {
    let page = Rc::new(ResultsPage {
        ctx,
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
        refresh_btn: dom::by_id_typed("refreshBtn"),
    });

    page.set_busy(true);
    let boot = bootstrap(&page.ctx.session, &page.ctx.gateway, Surface::Results).await;
    page.set_busy(false);
    match boot {
        Ok(report) => {
            let session = page.ctx.session.borrow();
            page.scores.render_boot(&session, &report);
            page.visual.render_boot(&session, &report);
        }
        Err(e) => {
            error!("initial load failed:", e.to_string());
            page.scores.show_failure();
            page.visual.show_failure();
        }
    }

    if let Some(btn) = &page.refresh_btn {
        on_click_async!(btn, &page, on_refresh);
    }
    page.scores.bind_toggle(&page.ctx)?;
    page.visual.bind_toggle(&page.ctx)?;
    Ok(())
}
