use crate::xr::gamepad_monitor::Handedness;
use crate::xr::hand_controller::{HandContext, HandController, HandSignal};
use crate::xr::session::{CONTROLLER_SLOTS, HapticPulseRequest, XrInputFrame};
use crate::xr::ui_panel::{HandMenu, PanelSurface};
use bevy::prelude::*;

/// Coordinates both hands and owns the notion of which one is skilled.
#[derive(Resource, Debug, Clone)]
pub struct ControllersManager {
    controllers: [HandController; CONTROLLER_SLOTS],
    user_handedness: Handedness,
    menu: HandMenu,
}

impl Default for ControllersManager {
    fn default() -> Self {
        Self::new(Handedness::default())
    }
}

impl ControllersManager {
    pub fn new(user_handedness: Handedness) -> Self {
        Self {
            controllers: [HandController::new(0), HandController::new(1)],
            user_handedness,
            menu: HandMenu::default(),
        }
    }

    pub fn user_handedness(&self) -> Handedness {
        self.user_handedness
    }

    /// True only once both hands report connected.
    pub fn connected(&self) -> bool {
        self.controllers.iter().all(HandController::connected)
    }

    pub fn controller(&self, slot: usize) -> Option<&HandController> {
        self.controllers.get(slot)
    }

    fn by_handedness(&self, handedness: Handedness) -> Option<&HandController> {
        self.controllers
            .iter()
            .find(|c| c.connected() && c.handedness() == Some(handedness))
    }

    pub fn skilled_hand(&self) -> Option<&HandController> {
        self.by_handedness(self.user_handedness)
    }

    pub fn other_hand(&self) -> Option<&HandController> {
        self.by_handedness(self.user_handedness.opposite())
    }

    pub fn left(&self) -> Option<&HandController> {
        self.by_handedness(Handedness::Left)
    }

    pub fn right(&self) -> Option<&HandController> {
        self.by_handedness(Handedness::Right)
    }

    pub fn menu(&self) -> &HandMenu {
        &self.menu
    }

    pub fn menu_mut(&mut self) -> &mut HandMenu {
        &mut self.menu
    }

    /// Menu surface in world space, only while visible and carried by a hand.
    pub fn menu_surface(&self) -> Option<PanelSurface> {
        let slot = self.menu.attached_slot()?;
        let grip = self.controllers.get(slot)?.grip();
        self.menu.surface(&grip)
    }

    /// Swap (or set) the skilled hand and move the menu to the new off-hand.
    pub fn toggle_handedness(&mut self, handedness: Option<Handedness>) -> Handedness {
        let handedness = handedness.unwrap_or(self.user_handedness.opposite());
        self.user_handedness = handedness;

        for controller in self.controllers.iter_mut() {
            if let Some(side) = controller.handedness() {
                controller.set_skilled(side == handedness);
            }
        }

        match self.other_hand().map(HandController::slot) {
            Some(slot) => self.menu.attach(slot),
            None => self.menu.detach(),
        }
        info!("Skilled hand set to {}", handedness.as_str());
        handedness
    }

    pub fn on_connected(&mut self, slot: usize, handedness: Handedness, has_haptics: bool) {
        let user_handedness = self.user_handedness;
        let Some(controller) = self.controllers.get_mut(slot) else {
            return;
        };
        controller.on_connected(handedness, has_haptics);

        if handedness == user_handedness {
            controller.set_skilled(true);
        } else {
            controller.set_skilled(false);
            self.menu.attach(slot);
        }
        info!(
            "Controller {} connected ({}, skilled: {})",
            slot,
            handedness.as_str(),
            handedness == user_handedness
        );
    }

    pub fn on_disconnected(&mut self, slot: usize) {
        let Some(controller) = self.controllers.get_mut(slot) else {
            return;
        };
        controller.on_disconnected();
        if self.menu.attached_slot() == Some(slot) {
            self.menu.detach();
        }
        info!("Controller {} disconnected", slot);
    }

    /// Pose refresh for every slot, using `to_world` to leave tracking space.
    pub fn refresh_poses(&mut self, frame: &XrInputFrame, to_world: &Transform) {
        for (slot, controller) in self.controllers.iter_mut().enumerate() {
            if let Some(input) = frame.controller(slot) {
                let target_ray = to_world.mul_transform(input.target_ray.to_transform());
                let grip = to_world.mul_transform(input.grip.to_transform());
                controller.set_pose(&target_ray, &grip);
            }
        }
    }

    /// Run both hands for one frame. Poses must already be refreshed.
    pub fn update(
        &mut self,
        frame: &XrInputFrame,
        delta: f32,
        ctx: &HandContext,
    ) -> Vec<HandSignal> {
        let mut signals = Vec::new();
        for (slot, controller) in self.controllers.iter_mut().enumerate() {
            let sample = frame.controller(slot).map(|c| &c.gamepad);
            signals.extend(controller.update(sample, delta, ctx));
        }
        signals
    }

    pub fn pulse(
        &self,
        handedness: Handedness,
        intensity: f32,
        millis: u64,
    ) -> Option<HapticPulseRequest> {
        self.by_handedness(handedness)?.pulse(intensity, millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both_connected(user: Handedness) -> ControllersManager {
        let mut manager = ControllersManager::new(user);
        manager.on_connected(0, Handedness::Left, true);
        manager.on_connected(1, Handedness::Right, true);
        manager
    }

    #[test]
    fn accessors_are_absent_until_connected() {
        let mut manager = ControllersManager::new(Handedness::Right);
        assert!(manager.skilled_hand().is_none());
        assert!(manager.other_hand().is_none());
        assert!(!manager.connected());

        manager.on_connected(0, Handedness::Right, false);
        assert!(manager.skilled_hand().is_some());
        assert!(manager.left().is_none());
        assert!(!manager.connected());
    }

    #[test]
    fn connect_assigns_skill_and_menu() {
        let manager = both_connected(Handedness::Right);
        assert!(manager.connected());
        assert_eq!(manager.skilled_hand().unwrap().slot(), 1);
        assert!(manager.right().unwrap().skilled());
        assert!(!manager.left().unwrap().skilled());
        assert_eq!(manager.menu().attached_slot(), Some(0));
    }

    #[test]
    fn toggling_swaps_skill_on_both_hands_and_moves_menu() {
        let mut manager = both_connected(Handedness::Right);
        assert_eq!(manager.toggle_handedness(None), Handedness::Left);

        let skilled: Vec<bool> = [0, 1]
            .iter()
            .map(|slot| manager.controller(*slot).unwrap().skilled())
            .collect();
        assert_eq!(skilled, vec![true, false]);
        assert_eq!(manager.menu().attached_slot(), Some(1));

        manager.toggle_handedness(Some(Handedness::Left));
        assert!(manager.left().unwrap().skilled());
    }

    #[test]
    fn exactly_one_hand_is_skilled() {
        let mut manager = both_connected(Handedness::Left);
        for _ in 0..3 {
            let count = [0, 1]
                .iter()
                .filter(|slot| manager.controller(**slot).unwrap().skilled())
                .count();
            assert_eq!(count, 1);
            manager.toggle_handedness(None);
        }
    }

    #[test]
    fn disconnect_releases_menu() {
        let mut manager = both_connected(Handedness::Right);
        manager.menu_mut().toggle();
        assert!(manager.menu_surface().is_some());

        manager.on_disconnected(0);
        assert!(manager.menu_surface().is_none());
        assert!(!manager.connected());
        assert!(manager.left().is_none());
    }
}
