//! Ownership claims and their admin decisions

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;

use super::access::{ensure_owner_or_admin, require_role};
use super::items::load_item;
use super::lifecycle::{transition_item, CLAIMABLE};
use super::views::ClaimView;
use super::Page;
use crate::db::entities::claim;
use crate::db::entities::status::{ClaimStatus, ItemStatus, Role};
use crate::db::entities::user;
use crate::error::{Result, ServerError};

#[derive(Debug, Deserialize)]
pub struct NewClaim {
    pub item_id: i32,
    pub claim_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaimUpdate {
    pub claim_text: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    fn outcome(self) -> ClaimStatus {
        match self {
            Decision::Approve => ClaimStatus::Approved,
            Decision::Reject => ClaimStatus::Rejected,
        }
    }
}

async fn load_claim<C: ConnectionTrait>(db: &C, claim_id: i32) -> Result<claim::Model> {
    claim::Entity::find_by_id(claim_id)
        .one(db)
        .await?
        .ok_or(ServerError::NotFound("Claim"))
}

pub async fn create_claim<C: ConnectionTrait>(db: &C, actor: &user::Model, new_claim: NewClaim) -> Result<ClaimView> {
    let target = load_item(db, new_claim.item_id).await?;

    let created = claim::ActiveModel {
        item_id: Set(target.id),
        claimer_id: Set(actor.id),
        claim_text: Set(new_claim.claim_text),
        claim_status: Set(ClaimStatus::Pending),
        claimed_on: Set(Utc::now()),
        decided_by: Set(None),
        decided_on: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("User {} claimed item {} (claim {})", actor.id, target.id, created.id);
    ClaimView::one(db, created).await
}

/// Claims newest first, optionally filtered by status
pub async fn list_claims<C: ConnectionTrait>(db: &C, status: Option<ClaimStatus>, page: Page) -> Result<Vec<ClaimView>> {
    let mut query = claim::Entity::find()
        .order_by_desc(claim::Column::ClaimedOn)
        .order_by_desc(claim::Column::Id);
    if let Some(status) = status {
        query = query.filter(claim::Column::ClaimStatus.eq(status));
    }
    let rows = query.offset(page.skip).limit(page.limit).all(db).await?;
    ClaimView::assemble(db, rows).await
}

pub async fn get_claim<C: ConnectionTrait>(db: &C, claim_id: i32) -> Result<ClaimView> {
    let row = load_claim(db, claim_id).await?;
    ClaimView::one(db, row).await
}

/// Claimant or admin edits the text of a claim that is still pending.
///
/// The write is conditional on the pending status, so a decision that lands
/// first turns the edit into a `Conflict`.
pub async fn update_claim_text<C: ConnectionTrait>(
    db: &C,
    actor: &user::Model,
    claim_id: i32,
    update: ClaimUpdate,
) -> Result<ClaimView> {
    let row = load_claim(db, claim_id).await?;
    ensure_owner_or_admin(actor, row.claimer_id)?;

    let result = claim::Entity::update_many()
        .set(claim::ActiveModel {
            claim_text: Set(update.claim_text),
            ..Default::default()
        })
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::ClaimStatus.eq(ClaimStatus::Pending))
        .exec(db)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServerError::Conflict("Only pending claims can be edited".to_string()));
    }
    get_claim(db, claim_id).await
}

/// Approve or reject a pending claim (admin only).
///
/// The status change is conditional on the claim still being pending, so of
/// two concurrent decisions only one takes effect. Approval moves the item to
/// `claimed` inside the same transaction and fails unless the item is still
/// lost or found.
pub async fn decide_claim(
    db: &DatabaseConnection,
    actor: &user::Model,
    claim_id: i32,
    decision: Decision,
) -> Result<ClaimView> {
    require_role(actor, Role::Admin)?;
    let now = Utc::now();

    let txn = db.begin().await?;
    let row = load_claim(&txn, claim_id).await?;

    let result = claim::Entity::update_many()
        .set(claim::ActiveModel {
            claim_status: Set(decision.outcome()),
            decided_by: Set(Some(actor.id)),
            decided_on: Set(Some(now)),
            ..Default::default()
        })
        .filter(claim::Column::Id.eq(claim_id))
        .filter(claim::Column::ClaimStatus.eq(ClaimStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ServerError::Conflict("Claim already decided".to_string()));
    }

    if decision == Decision::Approve {
        transition_item(&txn, row.item_id, &CLAIMABLE, ItemStatus::Claimed, now).await?;
    }
    txn.commit().await?;

    tracing::info!("Admin {} {:?} claim {} on item {}", actor.id, decision, claim_id, row.item_id);
    get_claim(db, claim_id).await
}

/// Claimant or admin removes a claim in any status
pub async fn delete_claim<C: ConnectionTrait>(db: &C, actor: &user::Model, claim_id: i32) -> Result<()> {
    let row = load_claim(db, claim_id).await?;
    ensure_owner_or_admin(actor, row.claimer_id)?;
    row.delete(db).await?;
    tracing::info!("User {} deleted claim {}", actor.id, claim_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::AuthManager;
    use crate::db::test_database;
    use crate::portal::items::{create_item, get_item, NewItem};
    use crate::portal::users::{authenticate, ensure_admin, register, NewUser};
    use jsonwebtoken::Algorithm;
    use std::time::Duration;

    async fn student(db: &DatabaseConnection, roll: &str) -> user::Model {
        register(
            db,
            NewUser {
                name: Some(format!("Student {}", roll)),
                roll_number: Some(roll.to_string()),
                password: Some("pw".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    async fn lost_item(db: &DatabaseConnection, owner: &user::Model, title: &str) -> i32 {
        create_item(
            db,
            owner,
            NewItem {
                title: title.to_string(),
                category_id: None,
                description: None,
                current_status: ItemStatus::Lost,
            },
        )
        .await
        .unwrap()
        .item_id
    }

    fn claim_on(item_id: i32) -> NewClaim {
        NewClaim {
            item_id,
            claim_text: Some("It has my initials inside".to_string()),
        }
    }

    #[tokio::test]
    async fn test_approve_claim_marks_item_claimed() {
        let db = test_database().await;
        let admin = ensure_admin(&db, "ADMIN", "pw").await.unwrap();
        let owner = student(&db, "A").await;
        let claimer = student(&db, "B").await;
        let item_id = lost_item(&db, &owner, "Wallet").await;

        let claim = create_claim(&db, &claimer, claim_on(item_id)).await.unwrap();
        assert_eq!(claim.claim_status, ClaimStatus::Pending);
        assert_eq!(claim.item_title.as_deref(), Some("Wallet"));

        let approved = decide_claim(&db, &admin, claim.claim_id, Decision::Approve).await.unwrap();
        assert_eq!(approved.claim_status, ClaimStatus::Approved);
        assert_eq!(approved.decided_by, Some(admin.id));
        assert!(approved.decided_on.is_some());
        assert_eq!(approved.decider_name.as_deref(), Some("Administrator"));

        let item = get_item(&db, item_id).await.unwrap();
        assert_eq!(item.current_status, ItemStatus::Claimed);
        assert!(item.last_status_change.is_some());

        let again = decide_claim(&db, &admin, claim.claim_id, Decision::Approve).await;
        assert!(matches!(again, Err(ServerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reject_leaves_item_alone() {
        let db = test_database().await;
        let admin = ensure_admin(&db, "ADMIN", "pw").await.unwrap();
        let owner = student(&db, "A").await;
        let item_id = lost_item(&db, &owner, "Charger").await;
        let claim = create_claim(&db, &owner, claim_on(item_id)).await.unwrap();

        let rejected = decide_claim(&db, &admin, claim.claim_id, Decision::Reject).await.unwrap();
        assert_eq!(rejected.claim_status, ClaimStatus::Rejected);
        assert_eq!(get_item(&db, item_id).await.unwrap().current_status, ItemStatus::Lost);

        let late = decide_claim(&db, &admin, claim.claim_id, Decision::Approve).await;
        assert!(matches!(late, Err(ServerError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_second_approval_on_item_conflicts_and_rolls_back() {
        let db = test_database().await;
        let admin = ensure_admin(&db, "ADMIN", "pw").await.unwrap();
        let owner = student(&db, "A").await;
        let first = student(&db, "B").await;
        let second = student(&db, "C").await;
        let item_id = lost_item(&db, &owner, "Headphones").await;

        let a = create_claim(&db, &first, claim_on(item_id)).await.unwrap();
        let b = create_claim(&db, &second, claim_on(item_id)).await.unwrap();
        decide_claim(&db, &admin, a.claim_id, Decision::Approve).await.unwrap();

        let blocked = decide_claim(&db, &admin, b.claim_id, Decision::Approve).await;
        assert!(matches!(blocked, Err(ServerError::Conflict(_))));
        // The claim update was rolled back with the failed item cascade
        let b_after = get_claim(&db, b.claim_id).await.unwrap();
        assert_eq!(b_after.claim_status, ClaimStatus::Pending);
        assert!(b_after.decided_by.is_none());
    }

    #[tokio::test]
    async fn test_decisions_are_admin_only() {
        let db = test_database().await;
        let owner = student(&db, "A").await;
        let item_id = lost_item(&db, &owner, "Mug").await;
        let claim = create_claim(&db, &owner, claim_on(item_id)).await.unwrap();

        let denied = decide_claim(&db, &owner, claim.claim_id, Decision::Approve).await;
        assert!(matches!(denied, Err(ServerError::Forbidden)));

        let admin = ensure_admin(&db, "ADMIN", "pw").await.unwrap();
        let missing = decide_claim(&db, &admin, 4242, Decision::Reject).await;
        assert!(matches!(missing, Err(ServerError::NotFound("Claim"))));
    }

    #[tokio::test]
    async fn test_claim_text_edit_and_delete() {
        let db = test_database().await;
        let admin = ensure_admin(&db, "ADMIN", "pw").await.unwrap();
        let owner = student(&db, "A").await;
        let stranger = student(&db, "Z").await;
        let item_id = lost_item(&db, &owner, "Notebook").await;
        let claim = create_claim(&db, &owner, claim_on(item_id)).await.unwrap();

        let edited = update_claim_text(
            &db,
            &owner,
            claim.claim_id,
            ClaimUpdate {
                claim_text: Some("Green cover".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(edited.claim_text.as_deref(), Some("Green cover"));

        let foreign = update_claim_text(&db, &stranger, claim.claim_id, ClaimUpdate { claim_text: None }).await;
        assert!(matches!(foreign, Err(ServerError::Forbidden)));

        decide_claim(&db, &admin, claim.claim_id, Decision::Reject).await.unwrap();
        let frozen = update_claim_text(
            &db,
            &admin,
            claim.claim_id,
            ClaimUpdate {
                claim_text: Some("Blue cover".to_string()),
            },
        )
        .await;
        assert!(matches!(frozen, Err(ServerError::Conflict(_))));
        let kept = get_claim(&db, claim.claim_id).await.unwrap();
        assert_eq!(kept.claim_text.as_deref(), Some("Green cover"));
        assert_eq!(kept.claim_status, ClaimStatus::Rejected);

        assert!(matches!(
            delete_claim(&db, &stranger, claim.claim_id).await,
            Err(ServerError::Forbidden)
        ));
        delete_claim(&db, &owner, claim.claim_id).await.unwrap();
        assert!(matches!(get_claim(&db, claim.claim_id).await, Err(ServerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_claims_newest_first() {
        let db = test_database().await;
        let owner = student(&db, "A").await;
        let item_id = lost_item(&db, &owner, "Gloves").await;
        let first = create_claim(&db, &owner, claim_on(item_id)).await.unwrap();
        let second = create_claim(&db, &owner, claim_on(item_id)).await.unwrap();

        let all = list_claims(&db, None, Page::default()).await.unwrap();
        assert_eq!(all[0].claim_id, second.claim_id);
        assert_eq!(all[1].claim_id, first.claim_id);

        assert!(list_claims(&db, Some(ClaimStatus::Approved), Page::default())
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            create_claim(&db, &owner, claim_on(999)).await,
            Err(ServerError::NotFound("Item"))
        ));
    }

    #[tokio::test]
    async fn test_register_login_claim_approve_flow() {
        let db = test_database().await;
        let auth = AuthManager::new(b"flow-secret", Algorithm::HS256, Duration::from_secs(3600));
        let admin = ensure_admin(&db, "ADMIN", "admin-pass").await.unwrap();

        register(
            &db,
            NewUser {
                name: Some("Alice".into()),
                roll_number: Some("A100".into()),
                password: Some("alice-pass".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let alice = authenticate(&db, "A100", "alice-pass").await.unwrap().unwrap();
        let token = auth.issue_token(alice.id).unwrap();
        assert_eq!(auth.resolve_token(&token.token).unwrap(), alice.id);

        let item_id = lost_item(&db, &alice, "Blue Backpack").await;
        let bob = student(&db, "B200").await;
        let claim = create_claim(&db, &bob, claim_on(item_id)).await.unwrap();
        let approved = decide_claim(&db, &admin, claim.claim_id, Decision::Approve).await.unwrap();

        assert_eq!(approved.claim_status, ClaimStatus::Approved);
        assert_eq!(approved.decided_by, Some(admin.id));
        assert_eq!(get_item(&db, item_id).await.unwrap().current_status, ItemStatus::Claimed);
    }
}
