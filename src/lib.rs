pub mod shared {
    pub mod core {
        pub mod outbox_event;
        pub mod primitives;
    }
    pub mod infrastructure {
        pub mod database;
        pub mod event_log;
        pub mod outbox;
    }
    pub mod application {
        pub mod event_publisher;
        pub mod outbox_drainer;
        pub mod use_case;
    }
}

pub mod modules {
    pub mod users {
        pub mod core {
            pub mod events;
            pub mod user;
        }
        pub mod use_cases {
            pub mod create_user {
                pub mod command;
                pub mod decide;
                pub mod decision;
                pub mod handler;
            }
        }
        pub mod adapters {
            pub mod outbound {
                pub mod user_repository;
                pub mod user_repository_in_memory;
                pub mod user_repository_postgres;
            }
        }
    }
}

pub mod shell;
