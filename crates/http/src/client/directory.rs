//! Organisation directory lookups (departments, virtual groups, business
//! units, roles) used when configuring task assignees

use super::{ApiClient, ApiRequest, ClientError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentTree {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub manager_id: Option<String>,
    #[serde(default)]
    pub manager_name: Option<String>,
    #[serde(default)]
    pub secondary_manager_id: Option<String>,
    #[serde(default)]
    pub secondary_manager_name: Option<String>,
    #[serde(default)]
    pub children: Vec<DepartmentTree>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualGroupInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub group_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub member_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessUnitInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub children: Vec<BusinessUnitInfo>,
}

/// Role scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleType {
    /// Resolved against the members of a business unit
    BuBounded,
    BuUnbounded,
    Admin,
    Developer,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleInfo {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(rename = "type")]
    pub role_type: RoleType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// List endpoints answer either with a bare array or with `{"data": [...]}`
#[derive(Deserialize)]
#[serde(untagged)]
enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped { data: Option<Vec<T>> },
}

impl<T> ListPayload<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) => items,
            Self::Wrapped { data } => data.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct GroupFilter<'a> {
    #[serde(rename = "type")]
    group_type: Option<&'a str>,
    status: Option<&'a str>,
}

#[derive(Serialize)]
struct RoleFilter {
    #[serde(rename = "type")]
    role_type: Option<RoleType>,
}

/// Directory lookups issued through an [`ApiClient`] whose base URL points
/// at the admin center API
#[derive(Debug, Clone, Copy)]
pub struct Directory<'a> {
    client: &'a ApiClient,
}

impl ApiClient {
    pub fn directory(&self) -> Directory<'_> {
        Directory { client: self }
    }
}

impl Directory<'_> {
    async fn list<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<Vec<T>, ClientError> {
        let payload: Option<ListPayload<T>> = self.client.send(request).await?;
        Ok(payload.map(ListPayload::into_vec).unwrap_or_default())
    }

    pub async fn department_tree(&self) -> Result<Vec<DepartmentTree>, ClientError> {
        self.list(ApiRequest::get("/departments/tree")).await
    }

    pub async fn search_departments(&self, keyword: &str) -> Result<Vec<DepartmentTree>, ClientError> {
        self.list(ApiRequest::get("/departments/search").query_pair("keyword", keyword))
            .await
    }

    pub async fn virtual_groups(
        &self,
        group_type: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<VirtualGroupInfo>, ClientError> {
        let request = ApiRequest::get("/virtual-groups").query(&GroupFilter { group_type, status })?;
        self.list(request).await
    }

    pub async fn virtual_group(&self, id: &str) -> Result<VirtualGroupInfo, ClientError> {
        self.client.get(&format!("/virtual-groups/{id}")).await
    }

    pub async fn business_unit_tree(&self) -> Result<Vec<BusinessUnitInfo>, ClientError> {
        self.list(ApiRequest::get("/business-units/tree")).await
    }

    pub async fn business_units(&self) -> Result<Vec<BusinessUnitInfo>, ClientError> {
        self.list(ApiRequest::get("/business-units")).await
    }

    pub async fn business_unit(&self, id: &str) -> Result<BusinessUnitInfo, ClientError> {
        self.client.get(&format!("/business-units/{id}")).await
    }

    /// Roles members of the unit may be assigned
    pub async fn business_unit_roles(&self, id: &str) -> Result<Vec<RoleInfo>, ClientError> {
        self.list(ApiRequest::get(format!("/business-units/{id}/roles")))
            .await
    }

    pub async fn roles(&self, role_type: Option<RoleType>) -> Result<Vec<RoleInfo>, ClientError> {
        let request = ApiRequest::get("/roles").query(&RoleFilter { role_type })?;
        self.list(request).await
    }

    pub async fn bu_bounded_roles(&self) -> Result<Vec<RoleInfo>, ClientError> {
        self.list(ApiRequest::get("/task-assignment/roles/bu-bounded"))
            .await
    }

    pub async fn bu_unbounded_roles(&self) -> Result<Vec<RoleInfo>, ClientError> {
        self.list(ApiRequest::get("/task-assignment/roles/bu-unbounded"))
            .await
    }

    pub async fn role(&self, id: &str) -> Result<RoleInfo, ClientError> {
        self.client.get(&format!("/roles/{id}")).await
    }
}
