//! Diesel schema for workflow automation persistence.

diesel::table! {
    /// Workflow definitions. A null project means org-wide scope.
    workflows (id) {
        /// Workflow identifier.
        id -> Uuid,
        /// Owning organisation.
        org_id -> Uuid,
        /// Optional project narrowing.
        project_id -> Nullable<Uuid>,
        /// Workflow name.
        #[max_length = 255]
        name -> Varchar,
        /// Whether the workflow participates in evaluation.
        active -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Rule definitions with string-typed trigger columns, parsed into
    /// typed triggers on load.
    rules (id) {
        /// Rule identifier.
        id -> Uuid,
        /// Owning workflow.
        workflow_id -> Uuid,
        /// Evaluation position within the workflow.
        position -> Int4,
        /// Trigger resource type: task, card, milestone.
        #[max_length = 20]
        resource_type -> Varchar,
        /// Trigger target state, scoped to the resource type.
        #[max_length = 30]
        to_state -> Varchar,
        /// Optional task-type narrowing.
        task_type_id -> Nullable<Uuid>,
        /// Whether the rule participates in evaluation.
        active -> Bool,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Task templates copied into spawned tasks.
    task_templates (id) {
        /// Template identifier.
        id -> Uuid,
        /// Owning organisation.
        org_id -> Uuid,
        /// Template name, used as the spawned task's title.
        #[max_length = 255]
        name -> Varchar,
        /// Task type stamped onto spawned tasks.
        type_id -> Uuid,
        /// Priority stamped onto spawned tasks.
        priority -> Int2,
        /// Optional description copied onto spawned tasks.
        description -> Nullable<Text>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Rule-to-template bindings with per-rule execution order.
    rule_templates (rule_id, template_id) {
        /// Owning rule.
        rule_id -> Uuid,
        /// Referenced template.
        template_id -> Uuid,
        /// Instantiation order within the rule.
        execution_order -> Int4,
    }
}

diesel::table! {
    /// Append-only rule evaluation ledger. A partial unique index on
    /// (rule_id, origin_type, origin_id) where outcome = 'applied' backs
    /// the at-most-one-application guarantee.
    rule_executions (id) {
        /// Ledger row identifier.
        id -> Uuid,
        /// Evaluated rule.
        rule_id -> Uuid,
        /// Originating resource type.
        #[max_length = 20]
        origin_type -> Varchar,
        /// Originating entity identifier.
        origin_id -> Uuid,
        /// Outcome discriminant: applied, suppressed.
        #[max_length = 20]
        outcome -> Varchar,
        /// Suppression reason, set only for suppressed outcomes.
        #[max_length = 30]
        suppression_reason -> Nullable<Varchar>,
        /// User whose action triggered the originating event.
        triggered_by -> Nullable<Uuid>,
        /// Evaluation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    workflows,
    rules,
    task_templates,
    rule_templates,
    rule_executions
);
