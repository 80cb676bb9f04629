//! Rigid-body dynamics subsystem stub.

use subsystem_api::{
    export_subsystem, Role, Subsystem, SubsystemError, SubsystemId, SubsystemMetadata,
};

#[derive(Default)]
pub struct RigidDynamics {
    world_active: bool,
}

impl Subsystem for RigidDynamics {
    fn metadata(&self) -> SubsystemMetadata {
        SubsystemMetadata {
            id: SubsystemId::new("arclight.rigid-dynamics"),
            name: "Rigid Dynamics".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "Arclight Contributors".to_string(),
            description: "Rigid-body physics simulation subsystem".to_string(),
        }
    }

    fn roles(&self) -> Role {
        Role::PHYSICS
    }

    fn startup(&mut self) -> Result<(), SubsystemError> {
        tracing::info!("Physics world created");
        self.world_active = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SubsystemError> {
        tracing::info!("Physics world destroyed");
        self.world_active = false;
        Ok(())
    }
}

export_subsystem!(RigidDynamics);
