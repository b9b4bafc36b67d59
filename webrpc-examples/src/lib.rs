//! The `example.UserService` reference service.
//!
//! Messages are hand-written prost types matching `example/user.proto`; the
//! descriptor table and both typed clients come from [`unary_service!`].

use webrpc_client::unary_service;

#[derive(Clone, PartialEq, prost::Message)]
pub struct User {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(int64, tag = "3")]
    pub age: i64,
    /// Creation time as sent by the server.
    #[prost(string, tag = "4")]
    pub ctime: String,
    /// Last modification time as sent by the server.
    #[prost(string, tag = "5")]
    pub mtime: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UserId {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

/// Update of the fields named in `update_mask` (e.g. `"user.name"`).
#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateUserReq {
    #[prost(message, optional, tag = "1")]
    pub user: Option<User>,
    #[prost(string, repeated, tag = "2")]
    pub update_mask: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListUsersReq {
    #[prost(int64, tag = "1")]
    pub page: i64,
    #[prost(int64, tag = "2")]
    pub page_size: i64,
    #[prost(string, tag = "3")]
    pub filter: String,
    #[prost(string, repeated, tag = "4")]
    pub orderby: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ListUsersResp {
    #[prost(message, repeated, tag = "1")]
    pub users: Vec<User>,
    #[prost(int64, tag = "2")]
    pub total_count: i64,
    #[prost(int64, tag = "3")]
    pub page_count: i64,
}

/// Wire-compatible with `google.protobuf.Empty`.
#[derive(Clone, Copy, PartialEq, prost::Message)]
pub struct Empty {}

unary_service! {
    /// CRUD operations on users.
    service "example.UserService" {
        descriptors: user_service;
        callback: UserServiceClient;
        promise: UserServicePromiseClient;

        rpc CreateUser(User) returns (User) => create_user;
        rpc DeleteUser(UserId) returns (Empty) => delete_user;
        rpc UpdateUser(UpdateUserReq) returns (User) => update_user;
        rpc GetUser(UserId) returns (User) => get_user;
        rpc ListUsers(ListUsersReq) returns (ListUsersResp) => list_users;
    }
}
