//! Forward renderer subsystem stub.

use subsystem_api::{
    export_subsystem, Role, Subsystem, SubsystemError, SubsystemId, SubsystemMetadata,
};

#[derive(Default)]
pub struct ForwardRenderer {
    device_ready: bool,
}

impl Subsystem for ForwardRenderer {
    fn metadata(&self) -> SubsystemMetadata {
        SubsystemMetadata {
            id: SubsystemId::new("arclight.forward-renderer"),
            name: "Forward Renderer".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "Arclight Contributors".to_string(),
            description: "Single-pass forward rendering subsystem".to_string(),
        }
    }

    fn roles(&self) -> Role {
        Role::RENDERER
    }

    fn startup(&mut self) -> Result<(), SubsystemError> {
        // TODO: acquire a wgpu device once the render graph lands.
        tracing::info!("Forward renderer initialized (stub device)");
        self.device_ready = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<(), SubsystemError> {
        tracing::info!("Forward renderer released");
        self.device_ready = false;
        Ok(())
    }
}

export_subsystem!(ForwardRenderer);
