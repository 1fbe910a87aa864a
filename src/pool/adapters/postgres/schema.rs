//! Diesel schema for task-pool persistence.

diesel::table! {
    /// Task rows. Lifecycle columns are nullable and guarded by the
    /// `status` discriminant; the version column backs guarded updates.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Owning organisation.
        org_id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Task type.
        type_id -> Uuid,
        /// Optional card grouping.
        card_id -> Nullable<Uuid>,
        /// Task title.
        #[max_length = 255]
        title -> Varchar,
        /// Optional description.
        description -> Nullable<Text>,
        /// Priority (1–5).
        priority -> Int2,
        /// Lifecycle discriminant: available, claimed, completed.
        #[max_length = 20]
        status -> Varchar,
        /// Claimant, set only while claimed.
        claimed_by -> Nullable<Uuid>,
        /// Claim timestamp, set only while claimed.
        claimed_at -> Nullable<Timestamptz>,
        /// Work mode, set only while claimed.
        #[max_length = 20]
        claim_mode -> Nullable<Varchar>,
        /// Completion timestamp, set only when completed.
        completed_at -> Nullable<Timestamptz>,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creating user.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Card rows. No state column: card state is derived from task rows.
    cards (id) {
        /// Card identifier.
        id -> Uuid,
        /// Owning organisation.
        org_id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Optional milestone grouping.
        milestone_id -> Nullable<Uuid>,
        /// Card title.
        #[max_length = 255]
        title -> Varchar,
        /// Creating user.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Milestone rows. No state column: milestone state is derived.
    milestones (id) {
        /// Milestone identifier.
        id -> Uuid,
        /// Owning organisation.
        org_id -> Uuid,
        /// Owning project.
        project_id -> Uuid,
        /// Milestone title.
        #[max_length = 255]
        title -> Varchar,
        /// Creating user.
        created_by -> Uuid,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(tasks, cards, milestones);
