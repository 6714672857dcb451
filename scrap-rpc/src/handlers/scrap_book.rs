//! `scrapBook.*` procedures.

use scrap_core::{NoInput, ProcedureError, ScrapBook, ScrapBookRef};
use scrap_store::ScrapBookFilter;

use crate::context::Context;
use crate::router::ProcedureGroup;

pub fn group() -> ProcedureGroup {
    ProcedureGroup::new("scrapBook")
        .query("list", list)
        .query("public", public)
        .query("get", get)
}

/// The caller's own books, public or not.
async fn list(ctx: Context, _: NoInput) -> Result<Vec<ScrapBook>, ProcedureError> {
    let owner = ctx.require_identity()?.user_id.clone();
    Ok(ctx
        .store()
        .list_scrap_books(ScrapBookFilter::owned_by(owner))
        .await?)
}

async fn public(ctx: Context, _: NoInput) -> Result<Vec<ScrapBook>, ProcedureError> {
    Ok(ctx.store().list_scrap_books(ScrapBookFilter::public()).await?)
}

/// A private book someone else owns is reported as missing.
async fn get(ctx: Context, input: ScrapBookRef) -> Result<ScrapBook, ProcedureError> {
    let id = input.id();
    ctx.store()
        .get_scrap_book(&id)
        .await?
        .filter(|book| book.visible_to(ctx.user_id()))
        .ok_or_else(|| ProcedureError::not_found("scrap book", id))
}
