//! Esquema Diesel (mantenido a mano, en paridad con `migrations/`).

diesel::table! {
    programs (id) {
        id -> Uuid,
        title -> Text,
        location -> Text,
        status -> Text,
        capacity_limit -> Nullable<Int4>,
        created_by -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    program_dates (id) {
        id -> Uuid,
        program_id -> Uuid,
        date -> Date,
    }
}

diesel::table! {
    sewadars (id) {
        id -> Uuid,
        name -> Text,
        contact -> Nullable<Text>,
        joined_on -> Date,
    }
}

diesel::table! {
    accounts (id) {
        id -> Uuid,
        name -> Text,
        role -> Text,
        contact -> Nullable<Text>,
    }
}

diesel::table! {
    program_applications (id) {
        id -> Uuid,
        program_id -> Uuid,
        sewadar_id -> Uuid,
        status -> Text,
        applied_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    details_submissions (id) {
        id -> Uuid,
        program_id -> Uuid,
        sewadar_id -> Uuid,
        details -> Jsonb,
        submitted_at -> Timestamptz,
    }
}

diesel::table! {
    program_selections (id) {
        id -> Uuid,
        program_id -> Uuid,
        sewadar_id -> Uuid,
        selected_by -> Uuid,
        status -> Text,
        priority_score -> Int8,
        reason -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    attendance (id) {
        id -> Uuid,
        sewadar_id -> Uuid,
        program_date_id -> Uuid,
    }
}

diesel::table! {
    program_workflows (id) {
        id -> Uuid,
        program_id -> Uuid,
        current_stage -> Int4,
        form_released -> Bool,
        details_collected -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    notification_preferences (stage) {
        stage -> Int4,
        enabled -> Bool,
        message_template -> Text,
    }
}

diesel::table! {
    program_notification_preferences (program_id, stage) {
        program_id -> Uuid,
        stage -> Int4,
        enabled -> Nullable<Bool>,
        message -> Nullable<Text>,
    }
}

diesel::joinable!(attendance -> program_dates (program_date_id));
diesel::joinable!(program_dates -> programs (program_id));

diesel::allow_tables_to_appear_in_same_query!(
    programs,
    program_dates,
    sewadars,
    accounts,
    program_applications,
    details_submissions,
    program_selections,
    attendance,
    program_workflows,
    notification_preferences,
    program_notification_preferences,
);
