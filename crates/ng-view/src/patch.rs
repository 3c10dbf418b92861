//! Patch change editing

use ng_core::{Beats, MidiChannel, PatchChange, PatchChangeId, clamp_bank, clamp_to_0_127};
use ng_state::{NoteDiffCommand, PatchProperty};

use crate::MidiView;

impl MidiView {
    /// Patch changes inside the region, in time order
    pub fn patch_changes(&self) -> Vec<PatchChange> {
        self.model
            .read()
            .patch_changes()
            .iter()
            .filter(|p| self.region.contains(p.time))
            .copied()
            .collect()
    }

    pub fn patch_change(&self, id: PatchChangeId) -> Option<PatchChange> {
        self.model.read().patch_change(id).copied()
    }

    pub fn add_patch_change(
        &mut self,
        time: Beats,
        channel: MidiChannel,
        program: u8,
        bank: u16,
    ) -> Option<PatchChangeId> {
        if !self.region.contains(time) {
            return None;
        }
        let patch = PatchChange::new(time, channel as i32, program as i32, bank as i32);
        let mut cmd = self.model.new_diff_command("add patch change");
        cmd.add_patch_change(patch);
        self.apply_patch_command(cmd).then_some(patch.id)
    }

    pub fn delete_patch_change(&mut self, id: PatchChangeId) -> bool {
        if self.patch_change(id).is_none() {
            return false;
        }
        let mut cmd = self.model.new_diff_command("delete patch change");
        cmd.remove_patch_change(id);
        self.apply_patch_command(cmd)
    }

    pub fn move_patch_change(&mut self, id: PatchChangeId, time: Beats) -> bool {
        match self.patch_change(id) {
            Some(p) if p.time != time => {}
            _ => return false,
        }
        let mut cmd = self.model.new_diff_command("move patch change");
        cmd.change_patch_change(id, PatchProperty::Time(time.max(Beats::ZERO)));
        self.apply_patch_command(cmd)
    }

    /// Replace channel, program and bank
    pub fn change_patch_change(
        &mut self,
        id: PatchChangeId,
        channel: MidiChannel,
        program: u8,
        bank: u16,
    ) -> bool {
        let Some(old) = self.patch_change(id) else {
            return false;
        };
        let mut changes = Vec::new();
        if old.channel != channel {
            changes.push(PatchProperty::Channel(channel as i32));
        }
        if old.program != program {
            changes.push(PatchProperty::Program(program as i32));
        }
        if old.bank != bank {
            changes.push(PatchProperty::Bank(bank as i32));
        }
        if changes.is_empty() {
            return false;
        }
        let mut cmd = self.model.new_diff_command("change patch change");
        for change in changes {
            cmd.change_patch_change(id, change);
        }
        self.apply_patch_command(cmd)
    }

    /// Step the program (or bank) up or down, stopping at the range limits
    pub fn step_patch(&mut self, id: PatchChangeId, bank: bool, delta: i32) -> bool {
        let Some(old) = self.patch_change(id) else {
            return false;
        };
        let property = if bank {
            let value = clamp_bank(old.bank as i32 + delta);
            if value == old.bank {
                return false;
            }
            PatchProperty::Bank(value as i32)
        } else {
            let value = clamp_to_0_127(old.program as i32 + delta);
            if value == old.program {
                return false;
            }
            PatchProperty::Program(value as i32)
        };
        let mut cmd = self.model.new_diff_command("step patch");
        cmd.change_patch_change(id, property);
        self.apply_patch_command(cmd)
    }

    fn apply_patch_command(&mut self, cmd: NoteDiffCommand) -> bool {
        let name = cmd.name().to_string();
        match cmd.apply(false) {
            Ok(_) => {
                self.sync();
                self.mark_patches_changed();
                self.flush_events();
                true
            }
            Err(e) => {
                log::warn!("Edit '{}' rejected: {}", name, e);
                false
            }
        }
    }
}
