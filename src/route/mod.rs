use rocket::{Build, Rocket, Route};

pub mod chat;
pub mod class;
pub mod exam;
pub mod homework;
pub mod org;
pub mod task;
pub mod users;
pub mod webhook;
pub mod ws;

fn user_routes() -> Vec<Route> {
    routes![
        users::user_register,
        users::user_login,
        users::user_list,
        users::user_get,
        users::user_approve,
        users::user_update,
        users::user_delete
    ]
}

fn org_routes() -> Vec<Route> {
    routes![org::org_signup, org::org_get, org::org_update]
}

fn class_routes() -> Vec<Route> {
    routes![
        class::class_create,
        class::class_list,
        class::class_get,
        class::class_attach_subject,
        class::class_delete
    ]
}

fn subject_routes() -> Vec<Route> {
    routes![class::subject_create, class::subject_list, class::subject_get]
}

fn exam_routes() -> Vec<Route> {
    routes![
        exam::exam_create,
        exam::exam_list,
        exam::exam_get,
        exam::exam_set_mark,
        exam::exam_delete
    ]
}

fn homework_routes() -> Vec<Route> {
    routes![
        homework::homework_create,
        homework::homework_list,
        homework::homework_get,
        homework::homework_delete
    ]
}

fn task_routes() -> Vec<Route> {
    routes![
        task::task_create,
        task::task_list,
        task::task_get,
        task::task_update,
        task::task_delete
    ]
}

fn chat_routes() -> Vec<Route> {
    routes![
        chat::chat_create,
        chat::chat_list,
        chat::chat_get,
        chat::chat_add_participant,
        chat::chat_remove_participant,
        chat::message_list,
        chat::message_send,
        ws::chat_socket
    ]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/api/v1/users", user_routes())
        .mount("/api/v1/organizations", org_routes())
        .mount("/api/v1/classes", class_routes())
        .mount("/api/v1/subjects", subject_routes())
        .mount("/api/v1/exams", exam_routes())
        .mount("/api/v1/homework", homework_routes())
        .mount("/api/v1/tasks", task_routes())
        .mount("/api/v1/chats", chat_routes())
        .mount("/api/v1/billing", routes![webhook::stripe_webhook])
}
