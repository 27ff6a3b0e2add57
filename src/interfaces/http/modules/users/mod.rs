pub mod dto;
pub mod handlers;

pub use dto::{CreateUserRequest, ListUsersParams, UpdateUserRequest, UserDto};
pub use handlers::{
    create_user, deactivate_user, get_user, list_users, reactivate_user, update_user,
    UserHandlerState,
};
