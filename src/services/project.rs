use std::sync::Arc;
use uuid::Uuid;

use crate::authz;
use crate::error::AppError;
use crate::models::page::{PageInfo, PageParams};
use crate::models::project::{
    MemberDetail, Project, ProjectDetail, ProjectMember, ProjectPatch, ProjectSummary,
};
use crate::models::user::UserRole;
use crate::store::Store;

/// Project CRUD and membership management, enforcing the admin-count and
/// unique-membership invariants.
#[derive(Clone)]
pub struct ProjectService {
    store: Arc<dyn Store>,
}

impl ProjectService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates a project with the creator as its first ADMIN member, in one
    /// atomic store operation. Every project has an admin from birth.
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        creator_id: Uuid,
    ) -> Result<ProjectDetail, AppError> {
        let project = Project::new(name, description);
        let admin = ProjectMember {
            project_id: project.id,
            user_id: creator_id,
            role: UserRole::Admin,
        };
        self.store.create_project(&project, &admin).await?;
        log::info!("project created: {} by {}", project.id, creator_id);
        self.get(project.id, creator_id).await
    }

    /// Loads the full project view. 404 when absent, 403 when the requester
    /// is not a member.
    pub async fn get(&self, id: Uuid, requester_id: Uuid) -> Result<ProjectDetail, AppError> {
        let project = self
            .store
            .project_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".into()))?;

        let members = self.store.member_details(id).await?;
        if !authz::is_member(&members, requester_id) {
            return Err(AppError::Authorization(
                "You do not have permission to perform this action".into(),
            ));
        }

        let tasks = self.store.task_summaries(id).await?;
        Ok(ProjectDetail {
            project,
            members,
            tasks,
        })
    }

    /// Only projects where the requester holds a membership row.
    pub async fn list(
        &self,
        requester_id: Uuid,
        page: PageParams,
    ) -> Result<(Vec<ProjectSummary>, PageInfo), AppError> {
        let (projects, total) = self.store.projects_for_user(requester_id, &page).await?;
        Ok((projects, PageInfo::new(&page, total)))
    }

    pub async fn update(
        &self,
        id: Uuid,
        requester_id: Uuid,
        patch: ProjectPatch,
    ) -> Result<Project, AppError> {
        let detail = self.get(id, requester_id).await?;
        self.require_admin(&detail.members, requester_id, "update the project")?;

        let updated = self.store.update_project(id, &patch).await?;
        log::info!("project updated: {} by {}", id, requester_id);
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid, requester_id: Uuid) -> Result<(), AppError> {
        let detail = self.get(id, requester_id).await?;
        self.require_admin(&detail.members, requester_id, "delete the project")?;

        self.store.delete_project(id).await?;
        log::info!("project deleted: {} by {}", id, requester_id);
        Ok(())
    }

    /// Adds a member with the given role (default USER). 409 when the user is
    /// already a member.
    pub async fn add_member(
        &self,
        project_id: Uuid,
        requester_id: Uuid,
        new_user_id: Uuid,
        role: Option<UserRole>,
    ) -> Result<MemberDetail, AppError> {
        let detail = self.get(project_id, requester_id).await?;
        self.require_admin(&detail.members, requester_id, "add members")?;

        if authz::is_member(&detail.members, new_user_id) {
            return Err(AppError::Conflict(
                "User is already a member of this project".into(),
            ));
        }

        let user = self
            .store
            .user_by_id(new_user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let member = ProjectMember {
            project_id,
            user_id: new_user_id,
            role: role.unwrap_or(UserRole::User),
        };
        self.store.add_member(&member).await?;
        log::info!("member {} added to project {}", new_user_id, project_id);

        Ok(MemberDetail {
            user_id: member.user_id,
            role: member.role,
            user: user.into(),
        })
    }

    /// Removes a member, refusing to drop the project's admin count to zero.
    ///
    /// The check runs against the member list as read here; there is no row
    /// lock or conditional delete, so two racing removals that each observe
    /// two admins can still strand the project. Known gap.
    pub async fn remove_member(
        &self,
        project_id: Uuid,
        requester_id: Uuid,
        member_id: Uuid,
    ) -> Result<(), AppError> {
        let detail = self.get(project_id, requester_id).await?;
        self.require_admin(&detail.members, requester_id, "remove members")?;

        let target = authz::find_membership(&detail.members, member_id);
        if authz::admin_count(&detail.members) == 1
            && target.map_or(false, |m| m.role == UserRole::Admin)
        {
            return Err(AppError::Conflict(
                "Cannot remove the last admin from the project".into(),
            ));
        }

        self.store.remove_member(project_id, member_id).await?;
        log::info!(
            "member {} removed from project {} by {}",
            member_id,
            project_id,
            requester_id
        );
        Ok(())
    }

    fn require_admin(
        &self,
        members: &[MemberDetail],
        requester_id: Uuid,
        action: &str,
    ) -> Result<(), AppError> {
        if !authz::is_member(members, requester_id) {
            return Err(AppError::Authorization(
                "You are not a member of this project".into(),
            ));
        }
        if !authz::is_project_admin(members, requester_id) {
            return Err(AppError::Authorization(format!(
                "Only a project admin can {}",
                action
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use crate::store::MemStore;

    async fn setup() -> (ProjectService, Arc<MemStore>, Uuid, Uuid) {
        let store = Arc::new(MemStore::new());
        let service = ProjectService::new(store.clone());

        let alice = User::new(
            "alice@example.com".into(),
            "alice".into(),
            "hash".into(),
            None,
            None,
        );
        let bob = User::new(
            "bob@example.com".into(),
            "bob".into(),
            "hash".into(),
            None,
            None,
        );
        let (alice_id, bob_id) = (alice.id, bob.id);
        store.create_user(&alice).await.unwrap();
        store.create_user(&bob).await.unwrap();
        (service, store, alice_id, bob_id)
    }

    #[tokio::test]
    async fn test_creator_becomes_admin() {
        let (service, _, alice, _) = setup().await;
        let detail = service
            .create("Apollo".into(), None, alice)
            .await
            .unwrap();
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.members[0].user_id, alice);
        assert_eq!(detail.members[0].role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_non_member_cannot_read_project() {
        let (service, _, alice, bob) = setup().await;
        let detail = service.create("Apollo".into(), None, alice).await.unwrap();

        let err = service.get(detail.project.id, bob).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let missing = service.get(Uuid::new_v4(), alice).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_member_is_a_conflict() {
        let (service, _, alice, bob) = setup().await;
        let detail = service.create("Apollo".into(), None, alice).await.unwrap();
        let project_id = detail.project.id;

        service
            .add_member(project_id, alice, bob, None)
            .await
            .unwrap();
        let err = service
            .add_member(project_id, alice, bob, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_member_role_defaults_to_user() {
        let (service, _, alice, bob) = setup().await;
        let detail = service.create("Apollo".into(), None, alice).await.unwrap();

        let member = service
            .add_member(detail.project.id, alice, bob, None)
            .await
            .unwrap();
        assert_eq!(member.role, UserRole::User);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_removed() {
        let (service, _, alice, bob) = setup().await;
        let detail = service.create("Apollo".into(), None, alice).await.unwrap();
        let project_id = detail.project.id;

        // Sole admin removing themselves.
        let err = service
            .remove_member(project_id, alice, alice)
            .await
            .unwrap_err();
        match err {
            AppError::Conflict(msg) => assert!(msg.contains("last admin")),
            other => panic!("expected Conflict, got {:?}", other),
        }

        // Promote a second admin, then the removal succeeds.
        service
            .add_member(project_id, alice, bob, Some(UserRole::Admin))
            .await
            .unwrap();
        service
            .remove_member(project_id, alice, alice)
            .await
            .unwrap();

        let remaining = service.get(project_id, bob).await.unwrap();
        assert_eq!(remaining.members.len(), 1);
        assert_eq!(remaining.members[0].user_id, bob);
    }

    #[tokio::test]
    async fn test_non_admin_cannot_mutate() {
        let (service, _, alice, bob) = setup().await;
        let detail = service.create("Apollo".into(), None, alice).await.unwrap();
        let project_id = detail.project.id;
        service
            .add_member(project_id, alice, bob, Some(UserRole::Manager))
            .await
            .unwrap();

        let patch = ProjectPatch {
            name: Some("Artemis".into()),
            ..Default::default()
        };
        let err = service.update(project_id, bob, patch).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = service.delete(project_id, bob).await.unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));

        let err = service
            .add_member(project_id, bob, Uuid::new_v4(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_paginated() {
        let (service, _, alice, bob) = setup().await;
        for name in ["P1", "P2", "P3"] {
            service.create(name.into(), None, alice).await.unwrap();
        }
        service.create("Bobs".into(), None, bob).await.unwrap();

        let page = PageParams::new(Some(1), Some(2), None, None);
        let (projects, info) = service.list(alice, page).await.unwrap();
        assert_eq!(projects.len(), 2);
        assert_eq!(info.total, 3);
        assert_eq!(info.pages, 2);

        let page = PageParams::new(Some(1), Some(10), None, None);
        let (projects, info) = service.list(bob, page).await.unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(info.total, 1);
        assert_eq!(projects[0].project.name, "Bobs");
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (service, _, alice, _) = setup().await;
        let detail = service
            .create("Apollo".into(), Some("Moonshot".into()), alice)
            .await
            .unwrap();

        let patch = ProjectPatch {
            status: Some(crate::models::project::ProjectStatus::Completed),
            ..Default::default()
        };
        let updated = service
            .update(detail.project.id, alice, patch)
            .await
            .unwrap();
        assert_eq!(updated.name, "Apollo");
        assert_eq!(updated.description.as_deref(), Some("Moonshot"));
        assert_eq!(
            updated.status,
            crate::models::project::ProjectStatus::Completed
        );
    }
}
