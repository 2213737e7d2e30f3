use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// --- Users ---
// Never serialized directly: the password hash and TOTP secret stay server-side.
// Handlers answer with `api::users::UserProfile` instead.
pub mod user {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub first_name: String,
        pub last_name: String,
        #[sea_orm(unique)]
        pub email: String,
        pub password_hash: String,
        pub mfa_enabled: bool,
        pub mfa_secret: Option<String>,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::card::Entity")]
        Card,
        #[sea_orm(has_many = "super::bill::Entity")]
        Bill,
    }

    impl Related<super::card::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Card.def()
        }
    }

    impl Related<super::bill::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Bill.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

// --- Cards ---
pub mod card {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, DeriveEntityModel, ToSchema)]
    #[sea_orm(table_name = "cards")]
    #[schema(as = Card)]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub card_holder: String,
        /// Last four digits of the PAN; the full number is never stored.
        pub last4: String,
        #[schema(example = "debit")]
        pub card_type: String,
        #[schema(example = "09/28")]
        pub expiry: String,
        pub balance_cents: i64,
        #[schema(example = "active")]
        pub status: String,
        #[schema(value_type = String, format = DateTime)]
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::user::Entity",
            from = "Column::UserId",
            to = "super::user::Column::Id"
        )]
        User,
    }

    impl Related<super::user::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

// --- Bills ---
pub mod bill {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, DeriveEntityModel, ToSchema)]
    #[sea_orm(table_name = "bills")]
    #[schema(as = Bill)]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub user_id: i64,
        pub payee: String,
        pub description: Option<String>,
        pub amount_cents: i64,
        #[schema(value_type = String, format = Date)]
        pub due_date: Date,
        #[schema(example = "pending")]
        pub status: String,
        #[schema(value_type = Option<String>, format = DateTime)]
        pub paid_at: Option<DateTimeUtc>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::user::Entity",
            from = "Column::UserId",
            to = "super::user::Column::Id"
        )]
        User,
    }

    impl Related<super::user::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
