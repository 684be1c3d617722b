//! Database schema definitions for Diesel.

diesel::table! {
    users (id) {
        id -> Integer,
        email -> Text,
        display_name -> Text,
        avatar_url -> Nullable<Text>,
        password_hash -> Nullable<Text>,
        role -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    profiles (id) {
        id -> Integer,
        user_id -> Integer,
        username -> Text,
        bio -> Nullable<Text>,
        avatar_url -> Nullable<Text>,
        cover_url -> Nullable<Text>,
        genres -> Nullable<Text>,
        location -> Nullable<Text>,
        equipment -> Nullable<Text>,
        social_links -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        user_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    mixes (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        description -> Nullable<Text>,
        audio_url -> Text,
        cover_url -> Nullable<Text>,
        genre -> Nullable<Text>,
        duration -> Integer,
        play_count -> Integer,
        is_public -> Bool,
        tags -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    mix_likes (id) {
        id -> Integer,
        mix_id -> Integer,
        user_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    comments (id) {
        id -> Integer,
        mix_id -> Integer,
        user_id -> Integer,
        parent_id -> Nullable<Integer>,
        content -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    comment_likes (id) {
        id -> Integer,
        comment_id -> Integer,
        user_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    follows (id) {
        id -> Integer,
        follower_id -> Integer,
        followee_id -> Integer,
        created_at -> Timestamp,
    }
}

diesel::table! {
    play_history (id) {
        id -> Integer,
        identifier -> Text,
        mix_id -> Integer,
        played_at -> Timestamp,
    }
}

diesel::table! {
    live_streams (id) {
        id -> Integer,
        user_id -> Integer,
        username -> Text,
        provider_id -> Nullable<Text>,
        stream_key -> Nullable<Text>,
        playback_url -> Nullable<Text>,
        created_at -> Timestamp,
    }
}

// Define foreign key relationships
diesel::joinable!(profiles -> users (user_id));
diesel::joinable!(sessions -> users (user_id));
diesel::joinable!(mixes -> users (user_id));
diesel::joinable!(mix_likes -> mixes (mix_id));
diesel::joinable!(mix_likes -> users (user_id));
diesel::joinable!(comments -> mixes (mix_id));
diesel::joinable!(comments -> users (user_id));
diesel::joinable!(comment_likes -> comments (comment_id));
diesel::joinable!(comment_likes -> users (user_id));
diesel::joinable!(play_history -> mixes (mix_id));
diesel::joinable!(live_streams -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    profiles,
    sessions,
    mixes,
    mix_likes,
    comments,
    comment_likes,
    follows,
    play_history,
    live_streams,
);
