// HTTP handlers module structure

pub(crate) mod health_handlers;
pub(crate) mod member_handlers;
pub(crate) mod notification_handlers;
pub(crate) mod user_handlers;
pub(crate) mod workspace_handlers;
