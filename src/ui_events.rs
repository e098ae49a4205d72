use crate::app_state::State;
use crate::config::SceneConfig;
use crate::sections::Section;

#[derive(Debug)]
pub enum UserCommand {
    ApplySceneConfig(Box<SceneConfig>),
    ShowSection(Section),
    SetParticleCount(u32),
    StateInitialized, // Notifies App that State setup is complete
}

impl UserCommand {
    /// Command for a `#fragment` anchor. Unknown fragments are ignored.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let section = Section::from_fragment(fragment);
        if section.is_none() {
            log::warn!("No section for anchor {:?}, ignoring", fragment);
        }
        section.map(UserCommand::ShowSection)
    }
}

impl State {
    pub fn process_command(&mut self, command: UserCommand) {
        match command {
            UserCommand::ApplySceneConfig(config) => {
                log::info!("Applying scene config with {} layers.", config.network.layers.len());
                self.apply_scene_config(*config);
            }
            UserCommand::ShowSection(section) => self.show_section(section),
            UserCommand::SetParticleCount(count) => {
                log::info!("Setting particle count to {}.", count);
                self.set_particle_count(count);
            }
            UserCommand::StateInitialized => {
                // This command is handled in App::user_event
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_map_to_section_commands() {
        assert!(matches!(
            UserCommand::from_fragment("#research"),
            Some(UserCommand::ShowSection(Section::Research))
        ));
        assert!(UserCommand::from_fragment("#").is_none());
        assert!(UserCommand::from_fragment("#missing").is_none());
    }
}
