//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! The tables themselves are created by the migrations under `migrations/sqlite`.

use sea_query::Iden;

/// Raw session landing table.
#[derive(Iden)]
pub enum RawSessions {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "session_id"]
    SessionId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "state"]
    State,
    #[iden = "total_usd"]
    TotalUsd,
    #[iden = "number_of_cart_items"]
    NumberOfCartItems,
    #[iden = "store_integration_id"]
    StoreIntegrationId,
    #[iden = "channel"]
    Channel,
    #[iden = "source_file"]
    SourceFile,
    #[iden = "load_ts"]
    LoadTs,
}

/// Raw effect landing table.
#[derive(Iden)]
pub enum RawEffects {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "effect_id"]
    EffectId,
    #[iden = "session_id"]
    SessionId,
    #[iden = "effect_type"]
    EffectType,
    #[iden = "value"]
    Value,
    #[iden = "source_file"]
    SourceFile,
    #[iden = "load_ts"]
    LoadTs,
}

/// One row per deduplicated session.
#[derive(Iden)]
pub enum CanonicalSessions {
    Table,
    #[iden = "session_id"]
    SessionId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "state"]
    State,
    #[iden = "total_usd"]
    TotalUsd,
    #[iden = "number_of_cart_items"]
    NumberOfCartItems,
    #[iden = "store_integration_id"]
    StoreIntegrationId,
    #[iden = "channel"]
    Channel,
    #[iden = "source_load_ts"]
    SourceLoadTs,
}

/// One row per session with at least one effect.
#[derive(Iden)]
pub enum EffectRollups {
    Table,
    #[iden = "session_id"]
    SessionId,
    #[iden = "discount_amount_usd"]
    DiscountAmountUsd,
    #[iden = "representative_effect_type"]
    RepresentativeEffectType,
    #[iden = "source_load_ts"]
    SourceLoadTs,
}

/// Sessions joined with discounts, one row per canonical session.
#[derive(Iden)]
pub enum MergedSessions {
    Table,
    #[iden = "session_id"]
    SessionId,
    #[iden = "created_at"]
    CreatedAt,
    #[iden = "state"]
    State,
    #[iden = "total_usd"]
    TotalUsd,
    #[iden = "number_of_cart_items"]
    NumberOfCartItems,
    #[iden = "store_integration_id"]
    StoreIntegrationId,
    #[iden = "channel"]
    Channel,
    #[iden = "discount_amount_usd"]
    DiscountAmountUsd,
    #[iden = "net_revenue"]
    NetRevenue,
    #[iden = "discount_depth"]
    DiscountDepth,
    #[iden = "source_load_ts"]
    SourceLoadTs,
}
