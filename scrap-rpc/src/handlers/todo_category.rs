//! `todoCategory.*` procedures.
//!
//! Categories are private to their owner. Addressing someone else's category
//! answers `NOT_FOUND`, the same as an id that does not exist.

use chrono::Utc;

use scrap_core::{
    Category, CategoryId, CategoryRef, CreateCategory, NoInput, ProcedureError,
    UpdateCategoryInput, UserId,
};

use crate::context::Context;
use crate::router::ProcedureGroup;

pub fn group() -> ProcedureGroup {
    ProcedureGroup::new("todoCategory")
        .query("list", list)
        .mutation("create", create)
        .mutation("update", update)
        .mutation("delete", delete)
}

async fn list(ctx: Context, _: NoInput) -> Result<Vec<Category>, ProcedureError> {
    let owner = ctx.require_identity()?.user_id.clone();
    Ok(ctx.store().list_categories(&owner).await?)
}

async fn create(ctx: Context, input: CreateCategory) -> Result<Category, ProcedureError> {
    let owner = ctx.require_identity()?.user_id.clone();
    let now = Utc::now();
    let category = Category {
        id: CategoryId::new(),
        owner,
        name: input.name().to_string(),
        color: input.color().to_string(),
        created_at: now,
        updated_at: now,
    };
    ctx.store().save_category(&category).await?;
    tracing::debug!(category = %category.id, "category created");
    Ok(category)
}

/// Apply only the fields present in the input.
async fn update(ctx: Context, input: UpdateCategoryInput) -> Result<Category, ProcedureError> {
    let owner = ctx.require_identity()?.user_id.clone();
    let mut category = owned_category(&ctx, &owner, input.id()).await?;

    let changes = input.changes();
    if changes.is_empty() {
        return Ok(category);
    }
    if let Some(name) = changes.name() {
        category.name = name.to_string();
    }
    if let Some(color) = changes.color() {
        category.color = color.to_string();
    }
    category.updated_at = Utc::now();
    ctx.store().save_category(&category).await?;
    Ok(category)
}

/// Returns the removed category.
async fn delete(ctx: Context, input: CategoryRef) -> Result<Category, ProcedureError> {
    let owner = ctx.require_identity()?.user_id.clone();
    let category = owned_category(&ctx, &owner, input.id()).await?;
    if !ctx.store().delete_category(&category.id).await? {
        return Err(ProcedureError::not_found("category", category.id));
    }
    Ok(category)
}

async fn owned_category(
    ctx: &Context,
    owner: &UserId,
    id: CategoryId,
) -> Result<Category, ProcedureError> {
    ctx.store()
        .get_category(&id)
        .await?
        .filter(|category| &category.owner == owner)
        .ok_or_else(|| ProcedureError::not_found("category", id))
}
