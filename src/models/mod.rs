pub mod page;
pub mod project;
pub mod response;
pub mod task;
pub mod user;

pub use page::{PageInfo, PageParams, PageQuery, SortOrder};
pub use project::{
    MemberDetail, Project, ProjectDetail, ProjectMember, ProjectPatch, ProjectStatus,
    ProjectSummary,
};
pub use response::ApiResponse;
pub use task::{Task, TaskFilter, TaskPatch, TaskPriority, TaskStatus, TaskSummary};
pub use user::{PublicUser, RefreshTokenRecord, User, UserRole};
