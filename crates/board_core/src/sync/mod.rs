//! Relationship synchronizer for aggregate roots and their members.
//!
//! # Responsibility
//! - Reconcile a root's in-memory member collection with members that were
//!   persisted through member-level writes.
//! - Reassign members between roots without partial mutation.
//!
//! # Invariants
//! - No function here performs I/O.
//! - Preconditions are checked before any reference is mutated; a failed call
//!   leaves both root and member untouched.
//! - A collection never holds two members with the same id.
//! - `reassign_member` updates the member and the new root only. The old
//!   root's collection stays as it was until the caller runs
//!   `detach_member` and persists the foreign key.

use crate::fetch::{Association, Relationship};
use log::debug;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Entity owning or projecting a collection of members.
pub trait AggregateRoot {
    type Id: Copy + Eq + Debug;
    type Member: Member<RootId = Self::Id> + Clone;

    /// Static relationship descriptor for the member collection.
    const RELATIONSHIP: Relationship;

    fn root_id(&self) -> Self::Id;
    fn members(&self) -> &Association<Vec<Self::Member>>;
    fn members_mut(&mut self) -> &mut Association<Vec<Self::Member>>;

    /// Whether a member with `id` is in the loaded collection.
    ///
    /// Always `false` while the collection is unloaded.
    fn contains_member(&self, id: <Self::Member as Member>::Id) -> bool {
        self.members()
            .get()
            .is_some_and(|members| members.iter().any(|member| member.member_id() == id))
    }
}

/// Entity referencing exactly one aggregate root by foreign key.
pub trait Member {
    type Id: Copy + Eq + Debug;
    type RootId: Copy + Eq + Debug;

    fn member_id(&self) -> Self::Id;
    fn owner_id(&self) -> Self::RootId;
    fn set_owner_id(&mut self, owner: Self::RootId);
}

/// Synchronizer failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The member's owner does not match the root the caller expected.
    InconsistentState {
        relationship: &'static str,
        member: String,
        expected_owner: String,
        actual_owner: String,
    },
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InconsistentState {
                relationship,
                member,
                expected_owner,
                actual_owner,
            } => write!(
                f,
                "inconsistent {relationship}: member {member} is owned by {actual_owner}, expected {expected_owner}"
            ),
        }
    }
}

impl Error for SyncError {}

/// Links a just-persisted member into its root's in-memory collection.
///
/// - Repairs `member`'s back-reference when it points at another root.
/// - Adds the member to the loaded collection unless one with the same id is
///   already there, in which case that entry is refreshed.
/// - With an unloaded collection only the back-reference is repaired; the
///   member is already in storage and shows up on the next explicit load.
pub fn attach_member<R: AggregateRoot>(root: &mut R, member: &mut R::Member) {
    let root_id = root.root_id();
    if member.owner_id() != root_id {
        debug!(
            "event=member_owner_repair module=sync relationship={} member={:?} from={:?} to={:?}",
            R::RELATIONSHIP.name,
            member.member_id(),
            member.owner_id(),
            root_id
        );
        member.set_owner_id(root_id);
    }

    if let Some(members) = root.members_mut().get_mut() {
        upsert(members, member.clone());
    }
}

/// Fails with `InconsistentState` unless `member` is owned by `root`.
pub fn ensure_owned_by<R: AggregateRoot>(member: &R::Member, root: &R) -> Result<(), SyncError> {
    if member.owner_id() == root.root_id() {
        return Ok(());
    }
    Err(SyncError::InconsistentState {
        relationship: R::RELATIONSHIP.name,
        member: format!("{:?}", member.member_id()),
        expected_owner: format!("{:?}", root.root_id()),
        actual_owner: format!("{:?}", member.owner_id()),
    })
}

/// Moves `member` from `from_root` to `to_root` in memory.
///
/// Sets the member's owner and appends it to `to_root`'s loaded collection.
/// `from_root` is only read: removing the member from its collection and
/// persisting the new foreign key are left to the caller.
///
/// # Errors
/// - `InconsistentState` when `member` is not owned by `from_root`; nothing
///   is mutated in that case.
pub fn reassign_member<R: AggregateRoot>(
    member: &mut R::Member,
    from_root: &R,
    to_root: &mut R,
) -> Result<(), SyncError> {
    ensure_owned_by(member, from_root)?;

    member.set_owner_id(to_root.root_id());
    if let Some(members) = to_root.members_mut().get_mut() {
        upsert(members, member.clone());
    }
    Ok(())
}

/// Removes a member from the root's loaded collection and returns it.
///
/// Returns `None` when the collection is unloaded or holds no such member.
/// For owned relationships the returned member must be deleted or attached
/// to another root before the unit of work ends.
pub fn detach_member<R: AggregateRoot>(
    root: &mut R,
    member_id: <R::Member as Member>::Id,
) -> Option<R::Member> {
    let members = root.members_mut().get_mut()?;
    let index = members
        .iter()
        .position(|member| member.member_id() == member_id)?;
    debug!(
        "event=member_detach module=sync relationship={} kind={:?} removes_orphan={} member={:?}",
        R::RELATIONSHIP.name,
        R::RELATIONSHIP.kind,
        R::RELATIONSHIP.removes_orphans(),
        member_id
    );
    Some(members.remove(index))
}

fn upsert<M: Member>(members: &mut Vec<M>, member: M) {
    match members
        .iter()
        .position(|existing| existing.member_id() == member.member_id())
    {
        Some(index) => members[index] = member,
        None => members.push(member),
    }
}

#[cfg(test)]
mod tests {
    use super::{attach_member, detach_member, reassign_member, AggregateRoot, SyncError};
    use crate::fetch::Association;
    use crate::model::post::{HashTag, Post};
    use crate::model::{HashTagId, PostId};

    fn post(id: i64) -> Post {
        Post {
            id: PostId(id),
            writer: "kim".to_string(),
            title: format!("post {id}"),
            content: None,
            created_at: 0,
            updated_at: 0,
            hash_tags: Association::Loaded(Vec::new()),
        }
    }

    fn tag(id: i64, post_id: i64) -> HashTag {
        HashTag {
            id: HashTagId(id),
            tag_name: format!("tag{id}"),
            post_id: PostId(post_id),
        }
    }

    #[test]
    fn attach_twice_keeps_single_entry() {
        let mut root = post(1);
        let mut member = tag(10, 1);

        attach_member(&mut root, &mut member);
        attach_member(&mut root, &mut member);

        assert_eq!(root.hash_tags.get().map(Vec::len), Some(1));
        assert!(root.contains_member(HashTagId(10)));
    }

    #[test]
    fn attach_repairs_foreign_owner() {
        let other = post(2);
        let mut root = post(1);
        let mut member = tag(10, other.id.0);

        attach_member(&mut root, &mut member);

        assert_eq!(member.post_id, root.id);
        assert!(root.contains_member(member.id));
    }

    #[test]
    fn attach_to_unloaded_collection_only_repairs_owner() {
        let mut root = post(1);
        root.hash_tags = Association::Unloaded;
        let mut member = tag(10, 7);

        attach_member(&mut root, &mut member);

        assert_eq!(member.post_id, PostId(1));
        assert!(!root.hash_tags.is_loaded());
    }

    #[test]
    fn reassign_with_stale_owner_mutates_nothing() {
        let from = post(1);
        let mut to = post(2);
        let mut member = tag(10, 3);

        let err = reassign_member(&mut member, &from, &mut to).unwrap_err();

        assert!(matches!(err, SyncError::InconsistentState { .. }));
        assert_eq!(member.post_id, PostId(3));
        assert_eq!(to.hash_tags.get().map(Vec::len), Some(0));
    }

    #[test]
    fn reassign_updates_member_and_new_root_only() {
        let mut from = post(1);
        let mut to = post(2);
        let mut member = tag(10, 1);
        attach_member(&mut from, &mut member);

        reassign_member(&mut member, &from, &mut to).unwrap();

        assert_eq!(member.post_id, to.id);
        assert!(to.contains_member(member.id));
        // Old root is left for the caller to reconcile.
        assert!(from.contains_member(member.id));

        let detached = detach_member(&mut from, member.id).unwrap();
        assert_eq!(detached.id, member.id);
        assert!(!from.contains_member(member.id));
    }
}
