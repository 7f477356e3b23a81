//! Entity lifecycle transitions and factory entry points.
//!
//! Every transition notifies in the same three steps:
//!
//! 1. the entity's own traits declaring the capability, in registration order
//! 2. every global trait declaring the capability, in registration order
//! 3. one event on the bus
//!
//! Dependent subsystems rely on this order. A power trait, for example, must
//! see an owner change after the entity's own bookkeeping and before any
//! presentation consumer.
//!
//! The mutating API validates its preconditions before touching any state and
//! fails with a [`KernelError`] without partial effects. The `try_*` variants
//! are for command input that may be stale or invalid: they report a
//! rejected action as `Ok(false)` instead.

use glam::IVec2;
use tracing::{debug, warn};

use super::Simulation;
use crate::capability::{Capability, TraitHandle};
use crate::entity::{
    Entity, EntityId, EntityKind, LifecycleFlags, LifecycleState, LimboData, Placement,
    ProjectileState,
};
use crate::error::{KernelError, KernelResult};
use crate::event::{AttackerInfo, DeathKind, GameEvent};
use crate::factory::Target;
use crate::player::{PlayerId, SuperWeapon};

impl Simulation {
    // -------------------------------------------------------------------------
    // Notification
    // -------------------------------------------------------------------------

    /// Runs the three-step notification for `id`. `event` is dispatched last,
    /// if any.
    fn broadcast(
        &mut self,
        id: EntityId,
        capability: Capability,
        event: Option<GameEvent>,
        call: impl Fn(&TraitHandle, &mut Self) -> KernelResult<()>,
    ) -> KernelResult<()> {
        let local = self.entity(id)?.traits().filter(capability);
        for t in local.iter() {
            call(t, self)?;
        }
        let global = self.traits.filter(capability);
        for t in global.iter() {
            call(t, self)?;
        }
        if let Some(event) = event {
            self.events.dispatch(&event);
        }
        Ok(())
    }

    fn require_player(&self, player: Option<PlayerId>) -> KernelResult<()> {
        match player {
            Some(p) if self.players.get(p).is_none() => Err(KernelError::UnknownPlayer(p)),
            _ => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // World entry and exit
    // -------------------------------------------------------------------------

    /// Computes the placement for `entity` at `tile`. A footprint whose center
    /// falls off the map is clamped onto it and marked as a placeholder.
    fn place(&self, entity: &Entity, tile: IVec2) -> Placement {
        let (w, h) = entity.rules().footprint;
        let placement = Placement {
            tile,
            footprint: IVec2::new(w, h),
            placeholder: false,
        };
        if self.occupation.contains(placement.center_tile()) {
            return placement;
        }
        let max = self
            .occupation
            .map_size()
            .saturating_sub(placement.footprint)
            .max(IVec2::ZERO);
        let clamped = tile.clamp(IVec2::ZERO, max);
        warn!(
            entity = %entity.id(),
            name = entity.name(),
            x = tile.x,
            y = tile.y,
            "center tile outside map; using placeholder tile"
        );
        Placement {
            tile: clamped,
            placeholder: true,
            ..placement
        }
    }

    /// Moves an off-world entity into the world. No notifications.
    fn enter_world(&mut self, mut entity: Entity, tile: IVec2) -> KernelResult<()> {
        let id = entity.id();
        let placement = self.place(&entity, tile);
        entity.set_placement(Some(placement));
        entity.flags_mut().insert(LifecycleFlags::SPAWNED);
        let needs_update = entity.needs_update();

        self.world.spawn(entity)?;
        self.occupation.register(id, &placement);
        if needs_update && !self.updatables.contains(&id) {
            self.updatables.push(id);
        }
        Ok(())
    }

    /// Moves a spawned entity out of the world into the arena. No
    /// notifications.
    fn leave_world(&mut self, id: EntityId) -> KernelResult<()> {
        let mut entity = self.world.remove(id)?;
        entity.flags_mut().remove(LifecycleFlags::SPAWNED);
        entity.set_placement(None);
        self.occupation.unregister(id);
        self.updatables.retain(|&u| u != id);
        self.arena.insert(entity)
    }

    /// Removes the entity from its owner's books without notifying anyone.
    fn release_ownership(&mut self, id: EntityId) -> KernelResult<()> {
        let entity = self.entity_mut(id)?;
        let owner = entity.owner();
        entity.set_owner(None);
        if let Some(owner) = owner {
            self.player_mut(owner)?.remove_owned_object(id);
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Spawn / unspawn
    // -------------------------------------------------------------------------

    /// Places an unregistered entity into the world at `tile`.
    ///
    /// Registers it in the world and in tile occupation, adds it to the
    /// updatable set if it needs per-tick work, then notifies
    /// [`Capability::Spawn`] and dispatches [`GameEvent::ObjectSpawned`].
    ///
    /// # Errors
    ///
    /// - [`KernelError::NotFound`] if the entity does not exist
    /// - [`KernelError::AlreadySpawned`] if it is in the world
    /// - [`KernelError::InLimbo`] if it is in limbo
    /// - [`KernelError::AlreadyDestroyed`] / [`KernelError::Disposed`] if it
    ///   is dead
    pub fn spawn(&mut self, id: EntityId, tile: IVec2) -> KernelResult<()> {
        match self.entity(id)?.state() {
            LifecycleState::Unregistered => {}
            LifecycleState::Spawned => return Err(KernelError::AlreadySpawned(id)),
            LifecycleState::Limbo => return Err(KernelError::InLimbo(id)),
            LifecycleState::Destroyed => return Err(KernelError::AlreadyDestroyed(id)),
            LifecycleState::Disposed => return Err(KernelError::Disposed(id)),
        }
        let entity = self.arena.take(id).ok_or(KernelError::NotFound(id))?;
        self.enter_world(entity, tile)?;
        debug!(entity = %id, x = tile.x, y = tile.y, "spawned");

        self.broadcast(
            id,
            Capability::Spawn,
            Some(GameEvent::ObjectSpawned { target: id }),
            |t, sim| t.on_spawn(sim, id),
        )
    }

    /// Withdraws a spawned entity from the world.
    ///
    /// The entity keeps its identity, owner and traits and may be spawned
    /// again.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::NotSpawned`].
    pub fn unspawn(&mut self, id: EntityId) -> KernelResult<()> {
        if !self.entity(id)?.is_spawned() {
            return Err(KernelError::NotSpawned(id));
        }
        self.leave_world(id)?;
        debug!(entity = %id, "unspawned");
        self.notify_unspawn(id)
    }

    fn notify_unspawn(&mut self, id: EntityId) -> KernelResult<()> {
        self.broadcast(
            id,
            Capability::Unspawn,
            Some(GameEvent::ObjectUnspawned { target: id }),
            |t, sim| t.on_unspawn(sim, id),
        )
    }

    // -------------------------------------------------------------------------
    // Limbo
    // -------------------------------------------------------------------------

    /// Withdraws a spawned entity into limbo, for example a unit boarding a
    /// transport.
    ///
    /// Fires the unspawn notifications, then [`GameEvent::ObjectLimboed`].
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::NotSpawned`].
    pub fn limbo(&mut self, id: EntityId) -> KernelResult<()> {
        let entity = self.entity(id)?;
        if !entity.is_spawned() {
            return Err(KernelError::NotSpawned(id));
        }
        let data = LimboData {
            selected: self.viewer.selection.contains(&id),
        };

        self.leave_world(id)?;
        let entity = self.entity_mut(id)?;
        entity.flags_mut().insert(LifecycleFlags::LIMBO);
        entity.set_limbo_data(Some(data));
        self.viewer.selection.retain(|&s| s != id);
        debug!(entity = %id, "limboed");

        self.notify_unspawn(id)?;
        self.events.dispatch(&GameEvent::ObjectLimboed { target: id });
        Ok(())
    }

    /// Returns an entity from limbo to the world at `tile`.
    ///
    /// Restores the local viewer's selection if the entity was selected when
    /// it left. Fires the spawn notifications, then
    /// [`GameEvent::ObjectUnlimboed`].
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`], or [`KernelError::NotInLimbo`] if there is no
    /// limbo data.
    pub fn unlimbo(&mut self, id: EntityId, tile: IVec2) -> KernelResult<()> {
        let entity = self.entity(id)?;
        if entity.state() != LifecycleState::Limbo || entity.limbo_data().is_none() {
            return Err(KernelError::NotInLimbo(id));
        }
        let mut entity = self.arena.take(id).ok_or(KernelError::NotInLimbo(id))?;
        let data = entity.limbo_data().copied();
        entity.set_limbo_data(None);
        entity.flags_mut().remove(LifecycleFlags::LIMBO);
        self.enter_world(entity, tile)?;
        if data.is_some_and(|d| d.selected) {
            self.viewer.selection.push(id);
        }
        debug!(entity = %id, x = tile.x, y = tile.y, "unlimboed");

        self.broadcast(
            id,
            Capability::Spawn,
            Some(GameEvent::ObjectSpawned { target: id }),
            |t, sim| t.on_spawn(sim, id),
        )?;
        self.events.dispatch(&GameEvent::ObjectUnlimboed { target: id, tile });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Destroy / dispose
    // -------------------------------------------------------------------------

    /// Destroys an entity. Valid exactly once per entity.
    ///
    /// See [`destroy_with`](Simulation::destroy_with).
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::AlreadyDestroyed`].
    pub fn destroy(&mut self, id: EntityId, attacker: Option<AttackerInfo>) -> KernelResult<()> {
        self.destroy_with(id, attacker, DeathKind::Normal)
    }

    /// Destroys an entity with an explicit [`DeathKind`].
    ///
    /// In order:
    ///
    /// 1. score: a loss for the original owner, a kill for the attacking
    ///    player (unless it is the current owner)
    /// 2. health to zero, `DESTROYED` set
    /// 3. destroy notifications and [`GameEvent::ObjectDestroyed`]
    /// 4. one of
    ///    - rubble: a rubble-leaving building that died normally stays
    ///      registered as a non-live remnant; it leaves the updatable set
    ///      and tile occupation and fires the unspawn notifications
    ///    - full unspawn, if it is still spawned
    ///    - nothing more, if it was never spawned or sits in limbo
    /// 5. ownership released, then disposal
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::AlreadyDestroyed`].
    pub fn destroy_with(
        &mut self,
        id: EntityId,
        attacker: Option<AttackerInfo>,
        death: DeathKind,
    ) -> KernelResult<()> {
        let entity = match self.entity(id) {
            Err(KernelError::Disposed(_)) => return Err(KernelError::AlreadyDestroyed(id)),
            found => found?,
        };
        if entity.is_destroyed() {
            return Err(KernelError::AlreadyDestroyed(id));
        }
        let kind = entity.kind();
        let owner = entity.owner();
        let original_owner = entity.original_owner();
        let killer = attacker.and_then(|a| a.player);
        self.require_player(killer)?;

        if kind.is_techno() {
            if let Some(loser) = original_owner {
                self.player_mut(loser)?.record_loss(kind);
            }
            if let Some(killer) = killer.filter(|&k| Some(k) != owner) {
                self.player_mut(killer)?.record_kill(kind);
            }
        }

        let entity = self.entity_mut(id)?;
        entity.health_mut().current = 0;
        entity.flags_mut().insert(LifecycleFlags::DESTROYED);
        debug!(entity = %id, ?attacker, ?death, "destroyed");

        self.broadcast(
            id,
            Capability::Destroy,
            Some(GameEvent::ObjectDestroyed {
                target: id,
                attacker,
            }),
            |t, sim| t.on_destroy(sim, id, attacker.as_ref()),
        )?;

        let entity = self.entity(id)?;
        let spawned = entity.is_spawned();
        let rubble = spawned && entity.rules().leaves_rubble && death != DeathKind::Temporal;
        if rubble {
            let entity = self.entity_mut(id)?;
            entity.flags_mut().remove(LifecycleFlags::SPAWNED);
            entity.flags_mut().insert(LifecycleFlags::RUBBLE);
            self.occupation.unregister(id);
            self.updatables.retain(|&u| u != id);
            debug!(entity = %id, "left rubble");
            self.notify_unspawn(id)?;
        } else if spawned {
            self.leave_world(id)?;
            self.notify_unspawn(id)?;
        } else {
            let entity = self.entity_mut(id)?;
            entity.flags_mut().remove(LifecycleFlags::LIMBO);
            entity.set_limbo_data(None);
        }

        self.release_ownership(id)?;
        self.dispose(id)
    }

    /// Tears down a destroyed entity's traits and drops it from every store
    /// except the world, where rubble lingers. Terminal.
    fn dispose(&mut self, id: EntityId) -> KernelResult<()> {
        let entity = self.entity_mut(id)?;
        entity.flags_mut().insert(LifecycleFlags::DISPOSED);
        entity.traits_mut().clear();
        self.updatables.retain(|&u| u != id);
        self.viewer.selection.retain(|&s| s != id);
        let dropped = self.arena.take(id).is_some();
        debug!(entity = %id, dropped, "disposed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Ownership
    // -------------------------------------------------------------------------

    /// Transfers an entity to `new_owner`.
    ///
    /// Does nothing, and notifies no one, if the owner is unchanged.
    /// Otherwise updates both players' books, clears the local viewer's
    /// selection if it consisted solely of this entity and the entity is
    /// leaving the viewer, then notifies [`Capability::OwnerChange`] and
    /// dispatches [`GameEvent::ObjectOwnerChanged`].
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`], [`KernelError::Disposed`] or
    /// [`KernelError::UnknownPlayer`].
    pub fn change_owner(&mut self, id: EntityId, new_owner: Option<PlayerId>) -> KernelResult<()> {
        self.require_player(new_owner)?;
        let entity = self.entity(id)?;
        if entity.is_disposed() {
            return Err(KernelError::Disposed(id));
        }
        let old_owner = entity.owner();
        if old_owner == new_owner {
            return Ok(());
        }

        if let Some(old) = old_owner {
            self.player_mut(old)?.remove_owned_object(id);
        }
        if let Some(new) = new_owner {
            self.player_mut(new)?.add_owned_object(id);
        }
        self.entity_mut(id)?.set_owner(new_owner);

        if old_owner.is_some()
            && old_owner == self.viewer.player
            && self.viewer.selection.as_slice() == [id]
        {
            self.viewer.selection.clear();
        }
        debug!(entity = %id, ?old_owner, ?new_owner, "owner changed");

        self.broadcast(
            id,
            Capability::OwnerChange,
            Some(GameEvent::ObjectOwnerChanged {
                target: id,
                old_owner,
                new_owner,
            }),
            |t, sim| t.on_owner_change(sim, id, old_owner),
        )
    }

    // -------------------------------------------------------------------------
    // Traits, attacks, diplomacy
    // -------------------------------------------------------------------------

    /// Attaches a trait to an entity after creation.
    ///
    /// A spawned entity that gains a tick trait joins the updatable set.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::Disposed`].
    pub fn add_object_trait(&mut self, id: EntityId, handle: TraitHandle) -> KernelResult<()> {
        let trait_id = handle.id();
        let entity = self.entity_mut(id)?;
        if entity.is_disposed() {
            return Err(KernelError::Disposed(id));
        }
        entity.traits_mut().add(handle);
        if entity.is_spawned() && entity.needs_update() && !self.updatables.contains(&id) {
            self.updatables.push(id);
        }
        self.events.dispatch(&GameEvent::ObjectTraitAdded {
            target: id,
            trait_id,
        });
        Ok(())
    }

    /// Notifies [`Capability::Attack`] that `attacker` fired at `target`:
    /// the attacker's own traits, then global traits. No event.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] if the attacker does not exist.
    pub fn notify_attack(&mut self, attacker: EntityId, target: Target) -> KernelResult<()> {
        self.broadcast(attacker, Capability::Attack, None, |t, sim| {
            t.on_attack(sim, attacker, &target)
        })
    }

    /// Forms or breaks an alliance between two players and dispatches
    /// [`GameEvent::AllianceChanged`] if the table changed.
    ///
    /// Returns whether anything changed.
    ///
    /// # Errors
    ///
    /// [`KernelError::UnknownPlayer`].
    pub fn on_alliance_change(
        &mut self,
        first: PlayerId,
        second: PlayerId,
        allied: bool,
    ) -> KernelResult<bool> {
        self.require_player(Some(first))?;
        self.require_player(Some(second))?;
        let changed = self.alliances.set_allied(first, second, allied);
        if changed {
            debug!(%first, %second, allied, "alliance changed");
            self.events.dispatch(&GameEvent::AllianceChanged {
                first,
                second,
                allied,
            });
        }
        Ok(changed)
    }

    // -------------------------------------------------------------------------
    // Factory entry points
    // -------------------------------------------------------------------------

    /// Creates an unregistered object from rules.
    ///
    /// Returns `Ok(None)`, after logging, if the rules lookup or the factory
    /// rejects the name.
    ///
    /// # Errors
    ///
    /// Only invariant violations from the arena.
    pub fn create_object(&mut self, name: &str, kind: EntityKind) -> KernelResult<Option<EntityId>> {
        if let Err(err) = self.rules.require_object(name, kind) {
            warn!(%err, "skipping object creation");
            return Ok(None);
        }
        let id = self.arena.allocate_id();
        match self.factory.create(id, name, kind, self.rules.as_ref()) {
            Ok(entity) => {
                self.arena.insert(entity)?;
                debug!(entity = %id, name, %kind, "created");
                Ok(Some(id))
            }
            Err(err) => {
                warn!(%err, "factory rejected object");
                Ok(None)
            }
        }
    }

    /// Creates an object owned by `owner` and books its purchase value.
    ///
    /// # Errors
    ///
    /// [`KernelError::UnknownPlayer`].
    pub fn create_unit_for_player(
        &mut self,
        name: &str,
        kind: EntityKind,
        owner: PlayerId,
    ) -> KernelResult<Option<EntityId>> {
        self.require_player(Some(owner))?;
        let Some(id) = self.create_object(name, kind)? else {
            return Ok(None);
        };
        let entity = self.entity_mut(id)?;
        let cost = entity.rules().cost;
        entity.set_owner(Some(owner));
        entity.set_purchase_value(cost);

        let player = self.player_mut(owner)?;
        player.add_owned_object(id);
        player.purchase_value += u64::from(cost);
        Ok(Some(id))
    }

    /// Creates an unregistered projectile fired by `source` with `weapon`.
    /// The projectile inherits the source's owner.
    ///
    /// Returns `Ok(None)`, after logging, if the weapon or its projectile has
    /// no rules.
    ///
    /// # Errors
    ///
    /// [`KernelError::NotFound`] or [`KernelError::Disposed`] if `source`
    /// does not exist.
    pub fn create_projectile(
        &mut self,
        weapon: &str,
        source: EntityId,
        target: Target,
    ) -> KernelResult<Option<EntityId>> {
        let owner = self.entity(source)?.owner();
        self.build_projectile(weapon, Some(source), owner, target)
    }

    /// Creates an unregistered projectile with no firing object, for example
    /// a super weapon strike or scripted bombardment.
    ///
    /// # Errors
    ///
    /// [`KernelError::UnknownPlayer`].
    pub fn create_loose_projectile(
        &mut self,
        weapon: &str,
        target: Target,
        owner: Option<PlayerId>,
    ) -> KernelResult<Option<EntityId>> {
        self.require_player(owner)?;
        self.build_projectile(weapon, None, owner, target)
    }

    fn build_projectile(
        &mut self,
        weapon: &str,
        source: Option<EntityId>,
        owner: Option<PlayerId>,
        target: Target,
    ) -> KernelResult<Option<EntityId>> {
        let Some(weapon_rules) = self.rules.weapon(weapon).cloned() else {
            warn!(weapon, "no rules for weapon; projectile skipped");
            return Ok(None);
        };
        let Some(id) = self.create_object(&weapon_rules.projectile, EntityKind::Projectile)? else {
            return Ok(None);
        };
        let entity = self.entity_mut(id)?;
        entity.set_owner(owner);
        entity.set_projectile(ProjectileState {
            source,
            target,
            weapon: weapon_rules.name,
            remaining_ticks: weapon_rules.flight_ticks.max(1),
        });
        Ok(Some(id))
    }

    /// Grants `owner` a super weapon, uncharged.
    ///
    /// Returns `Ok(false)`, after logging, if there are no rules for it.
    ///
    /// # Errors
    ///
    /// [`KernelError::UnknownPlayer`].
    pub fn create_super_weapon(&mut self, name: &str, owner: PlayerId) -> KernelResult<bool> {
        self.require_player(Some(owner))?;
        let Some(rules) = self.rules.super_weapon(name).cloned() else {
            warn!(name, "no rules for super weapon; skipped");
            return Ok(false);
        };
        self.player_mut(owner)?.super_weapons.push(SuperWeapon {
            name: rules.name,
            owner,
            recharge_ticks: rules.recharge_ticks,
            remaining_ticks: rules.recharge_ticks,
        });
        Ok(true)
    }

    /// Builds a target: the object if it is live in the world, otherwise the
    /// tile.
    #[must_use]
    pub fn create_target(&self, object: Option<EntityId>, tile: IVec2) -> Target {
        match object {
            Some(id) if self.world.get_by_id(id).is_ok_and(|e| !e.is_destroyed()) => {
                Target::Object(id)
            }
            _ => Target::Tile(tile),
        }
    }

    // -------------------------------------------------------------------------
    // Command-facing variants
    // -------------------------------------------------------------------------

    /// [`spawn`](Simulation::spawn), or `Ok(false)` if the entity is not an
    /// unregistered live entity.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_spawn(&mut self, id: EntityId, tile: IVec2) -> KernelResult<bool> {
        if !self
            .entity(id)
            .is_ok_and(|e| e.state() == LifecycleState::Unregistered)
        {
            return Ok(false);
        }
        self.spawn(id, tile).map(|()| true)
    }

    /// [`unspawn`](Simulation::unspawn), or `Ok(false)` if not spawned.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_unspawn(&mut self, id: EntityId) -> KernelResult<bool> {
        if !self.entity(id).is_ok_and(Entity::is_spawned) {
            return Ok(false);
        }
        self.unspawn(id).map(|()| true)
    }

    /// [`limbo`](Simulation::limbo), or `Ok(false)` if not spawned.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_limbo(&mut self, id: EntityId) -> KernelResult<bool> {
        if !self.entity(id).is_ok_and(Entity::is_spawned) {
            return Ok(false);
        }
        self.limbo(id).map(|()| true)
    }

    /// [`unlimbo`](Simulation::unlimbo), or `Ok(false)` if not in limbo.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_unlimbo(&mut self, id: EntityId, tile: IVec2) -> KernelResult<bool> {
        if !self
            .entity(id)
            .is_ok_and(|e| e.state() == LifecycleState::Limbo)
        {
            return Ok(false);
        }
        self.unlimbo(id, tile).map(|()| true)
    }

    /// [`destroy`](Simulation::destroy), or `Ok(false)` if the entity is
    /// missing or already destroyed, or the attacker is unknown.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_destroy(&mut self, id: EntityId, attacker: Option<AttackerInfo>) -> KernelResult<bool> {
        let valid_attacker = attacker
            .and_then(|a| a.player)
            .map_or(true, |p| self.players.get(p).is_some());
        if !valid_attacker || !self.entity(id).is_ok_and(|e| !e.is_destroyed()) {
            return Ok(false);
        }
        self.destroy(id, attacker).map(|()| true)
    }

    /// [`change_owner`](Simulation::change_owner), or `Ok(false)` if the
    /// entity is dead or missing or the player is unknown.
    ///
    /// # Errors
    ///
    /// Only errors raised by notified traits.
    pub fn try_change_owner(&mut self, id: EntityId, new_owner: Option<PlayerId>) -> KernelResult<bool> {
        if self.require_player(new_owner).is_err()
            || !self.entity(id).is_ok_and(|e| !e.is_destroyed())
        {
            return Ok(false);
        }
        self.change_owner(id, new_owner).map(|()| true)
    }
}
