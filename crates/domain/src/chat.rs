use std::collections::BTreeSet;

use crate::errors::DomainError;
use crate::value_objects::{ChatId, Timestamp, UserId};

/// 聊天类型：多人群聊或两人私聊。
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Group,
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub kind: ChatKind,
    pub members: BTreeSet<UserId>,
    pub created_by: UserId,
    pub created_at: Timestamp,
}

impl Chat {
    pub fn new(
        id: ChatId,
        name: impl Into<String>,
        kind: ChatKind,
        members: BTreeSet<UserId>,
        created_by: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        if !members.contains(&created_by) {
            return Err(DomainError::invalid_argument(
                "members",
                "must contain the creator",
            ));
        }
        if kind == ChatKind::Direct && members.len() != 2 {
            return Err(DomainError::invalid_argument(
                "members",
                "direct chat requires exactly two members",
            ));
        }
        Ok(Self {
            id,
            name,
            kind,
            members,
            created_by,
            created_at,
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), DomainError> {
        self.name = Self::validate_name(name.into())?;
        Ok(())
    }

    /// 判断是否与给定成员对构成同一个私聊（成员集合相等，与顺序无关）。
    pub fn is_direct_with(&self, pair: &BTreeSet<UserId>) -> bool {
        self.kind == ChatKind::Direct && self.members == *pair
    }

    pub fn is_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument(
                "chat_name",
                "cannot be empty",
            ));
        }
        if trimmed.chars().count() > 64 {
            return Err(DomainError::invalid_argument("chat_name", "too long"));
        }
        Ok(trimmed.to_owned())
    }
}
