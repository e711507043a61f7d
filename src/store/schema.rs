// Table definitions for the tables the engine reads and writes. The
// migration step owns the DDL; this mirrors it.

diesel::table! {
    aircraft_instances (id) {
        id -> Int4,
        icao24 -> Varchar,
        callsign -> Varchar,
        registration -> Nullable<Varchar>,
        flight_type -> Varchar,
        status -> Varchar,
        controller -> Varchar,
        position -> Jsonb,
        flight_plan -> Nullable<Jsonb>,
        target_speed_kts -> Nullable<Float8>,
        target_heading_deg -> Nullable<Float8>,
        target_altitude_ft -> Nullable<Float8>,
        vertical_speed_fpm -> Nullable<Float8>,
        phase -> Nullable<Varchar>,
        last_event_fired -> Nullable<Varchar>,
        aircraft_type_id -> Nullable<Int4>,
        airline_id -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    aircraft_types (id) {
        id -> Int4,
        icao_type -> Varchar,
        cruise_speed_kts -> Nullable<Float8>,
        max_speed_kts -> Nullable<Float8>,
    }
}

diesel::table! {
    airlines (id) {
        id -> Int4,
        icao -> Varchar,
        name -> Varchar,
    }
}

diesel::table! {
    events (id) {
        id -> Int4,
        level -> Varchar,
        #[sql_name = "type"]
        event_type -> Varchar,
        message -> Text,
        details -> Nullable<Jsonb>,
        aircraft_id -> Nullable<Int4>,
        sector -> Nullable<Varchar>,
        frequency -> Nullable<Varchar>,
        direction -> Nullable<Varchar>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(aircraft_instances -> aircraft_types (aircraft_type_id));
diesel::joinable!(aircraft_instances -> airlines (airline_id));

diesel::allow_tables_to_appear_in_same_query!(aircraft_instances, aircraft_types, airlines);
