//! Diesel schema for task persistence.

diesel::table! {
    /// Prediction and training task records.
    tasks (task_code) {
        /// Externally visible task code.
        #[max_length = 60]
        task_code -> Varchar,
        /// Task kind (`prediction` or `training`).
        #[max_length = 20]
        kind -> Varchar,
        /// Human-readable task name.
        #[max_length = 60]
        name -> Varchar,
        /// Owning company.
        company_id -> Int8,
        /// Data source the task runs against.
        datasource_id -> Uuid,
        /// Validated prediction request, once recorded.
        prediction_request -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only task status log.
    task_statuses (id) {
        /// Monotonic row identifier; defines append order.
        id -> Int8,
        /// Owning task code.
        #[max_length = 60]
        task_code -> Varchar,
        /// Recorded state.
        #[max_length = 10]
        state -> Varchar,
        /// Optional free-text message.
        message -> Nullable<Text>,
        /// Append timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Canonical results of successful prediction tasks.
    task_results (task_code) {
        /// Owning task code.
        #[max_length = 60]
        task_code -> Varchar,
        /// Owning company.
        company_id -> Int8,
        /// Canonical result document.
        result -> Jsonb,
        /// Creation timestamp.
        created_at -> Timestamptz,
    }
}

diesel::joinable!(task_statuses -> tasks (task_code));
diesel::joinable!(task_results -> tasks (task_code));
diesel::allow_tables_to_appear_in_same_query!(tasks, task_statuses, task_results);
