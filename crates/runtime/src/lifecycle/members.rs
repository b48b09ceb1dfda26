//! Membership, invitations, and owner settings.
//!
//! Membership changes are serialized per island on a member gate, so they
//! never force the island's realm to load. Settings go through the entry
//! lock like every other island mutation.

use chrono::Utc;
use island_core::{Invitation, Island, IslandId, Location, Membership, PlayerId};
use tracing::info;

use super::Orchestrator;
use crate::api::{IslandError, Notice, Result};

impl Orchestrator {
    // ========================================================================
    // Members
    // ========================================================================

    /// Invites `target` to the island owned by `inviter`.
    pub async fn invite(&self, inviter: PlayerId, target: PlayerId) -> Result<Invitation> {
        let island = self.owned_by(inviter).await?;
        let _gate = self.member_gates.acquire(island).await;

        if target == inviter || self.store.load_membership(island, target).await?.is_some() {
            return Err(IslandError::AlreadyMember);
        }
        self.check_member_limit(island).await?;

        let invitation = Invitation::new(
            island,
            target,
            inviter,
            Utc::now(),
            self.config.invitation_ttl(),
        );
        self.store.save_invitation(&invitation).await?;

        self.notifier
            .notify(&[target], &Notice::Invited { island, inviter });
        Ok(invitation)
    }

    /// Turns a pending invitation into a membership.
    pub async fn accept_invite(&self, player: PlayerId, island: IslandId) -> Result<Membership> {
        let _gate = self.member_gates.acquire(island).await;
        let now = Utc::now();

        let invitation = self
            .store
            .load_invitation(island, player)
            .await?
            .ok_or(IslandError::InvitationMissing)?;
        if invitation.is_expired(now) {
            let _ = self.store.delete_invitation(island, player).await;
            return Err(IslandError::InvitationMissing);
        }

        if self.store.load_membership(island, player).await?.is_some() {
            let _ = self.store.delete_invitation(island, player).await;
            return Err(IslandError::AlreadyMember);
        }
        self.check_member_limit(island).await?;

        let membership = Membership::member(island, player, now);
        self.store.save_membership(&membership).await?;
        self.store.delete_invitation(island, player).await?;

        info!("{} joined island {}", player, island);
        let recipients = self.member_ids(island).await?;
        self.notifier
            .notify(&recipients, &Notice::MemberJoined { island, player });
        Ok(membership)
    }

    /// Removes `member` from the island owned by `owner`.
    pub async fn remove_member(&self, owner: PlayerId, member: PlayerId) -> Result<()> {
        let island = self.owned_by(owner).await?;
        if member == owner {
            return Err(IslandError::CannotRemoveOwner);
        }
        let _gate = self.member_gates.acquire(island).await;

        if self.store.load_membership(island, member).await?.is_none() {
            return Err(IslandError::NotFound);
        }
        let mut recipients = self.member_ids(island).await?;
        self.store.delete_membership(island, member).await?;

        info!("{} removed from island {}", member, island);
        if !recipients.contains(&member) {
            recipients.push(member);
        }
        self.notifier.notify(
            &recipients,
            &Notice::MemberRemoved {
                island,
                player: member,
            },
        );
        Ok(())
    }

    pub async fn members(&self, island: IslandId) -> Result<Vec<Membership>> {
        Ok(self.store.memberships_of_island(island).await?)
    }

    /// Invitations addressed to `player` that have not expired.
    pub async fn pending_invitations(&self, player: PlayerId) -> Result<Vec<Invitation>> {
        let now = Utc::now();
        Ok(self
            .store
            .invitations_for_player(player)
            .await?
            .into_iter()
            .filter(|inv| !inv.is_expired(now))
            .collect())
    }

    async fn member_ids(&self, island: IslandId) -> Result<Vec<PlayerId>> {
        Ok(self
            .members(island)
            .await?
            .into_iter()
            .map(|m| m.player_id)
            .collect())
    }

    async fn check_member_limit(&self, island: IslandId) -> Result<()> {
        let limit = self.config.max_members;
        if self.store.memberships_of_island(island).await?.len() >= limit {
            return Err(IslandError::MemberLimit { limit });
        }
        Ok(())
    }

    /// Island that `player` owns. Members of someone else's island get
    /// `NotOwner` rather than `NotFound`.
    async fn owned_by(&self, player: PlayerId) -> Result<IslandId> {
        match self.owned_island_id(player).await {
            Err(IslandError::NotFound) => match self.island_of_member(player).await {
                Ok(_) => Err(IslandError::NotOwner),
                Err(err) => Err(err),
            },
            other => other,
        }
    }

    // ========================================================================
    // Owner settings
    // ========================================================================

    pub async fn rename(&self, owner: PlayerId, name: &str) -> Result<()> {
        let name = name.trim().to_string();
        self.modify_owned(owner, move |island| {
            island.name = name;
            Ok(())
        })
        .await
    }

    /// Moves the island spawn; the location must be inside the boundary.
    pub async fn set_spawn(&self, owner: PlayerId, location: Location) -> Result<()> {
        self.modify_owned(owner, move |island| {
            if !island.contains(&location) {
                return Err(IslandError::OutsideBoundary);
            }
            island.spawn = location;
            Ok(())
        })
        .await
    }

    pub async fn set_pvp(&self, owner: PlayerId, enabled: bool) -> Result<()> {
        self.modify_owned(owner, move |island| {
            island.pvp = enabled;
            Ok(())
        })
        .await
    }

    pub async fn set_visitors_allowed(&self, owner: PlayerId, allowed: bool) -> Result<()> {
        self.modify_owned(owner, move |island| {
            island.visitors_allowed = allowed;
            Ok(())
        })
        .await
    }

    async fn modify_owned<T>(
        &self,
        owner: PlayerId,
        f: impl FnOnce(&mut Island) -> Result<T>,
    ) -> Result<T> {
        let id = self.owned_by(owner).await?;
        let mut island = self.lock_loaded(id).await?;
        self.commit(&mut island, f).await
    }
}
