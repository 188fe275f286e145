/*!
# DenOfIz RHI

Backend-neutral core of the DenOfIz rendering hardware interface.

One HLSL source and one set of calls drive backends with different native
models (descriptor tables or heaps, explicit barriers and layouts, bytecode
converted through an intermediate representation).

## Architecture

- **ShaderCompiler / ShaderProgram**: HLSL to DXIL, SPIR-V or converted
  bytecode, with reflection and an on-disk cache
- **RootSignatureLayout / RootSignature**: deterministic partition of the
  reflected bindings into root constants, root descriptors and tables
- **ResourceBindGroup**: live bindings of one register space
- **BarrierTranslator**: usage transitions to native barriers, with legacy
  and enhanced strategies
- **CommandList**: per-queue recorder; the only component that talks to
  the native queue

Backends implement the collaborator traits of [`device`] and
[`command_list::CommandListBackend`].
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod types;
pub mod shader;
pub mod binding;
pub mod barrier;
pub mod device;
pub mod command_list;

// Main dz namespace module
pub mod dz {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    pub use crate::config::RhiConfiguration;

    // Logging sub-module (types only; engine_* macros live at the crate root)
    pub mod log {
        pub use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};
    }

    pub use crate::types::*;
    pub use crate::shader::{
        CompileDesc, CompiledShader, ShaderCompiler, ShaderProgram, ShaderProgramDesc,
        ShaderReflectDesc, ShaderStageDesc, TargetIL,
    };
    pub use crate::binding::{
        ResourceBindGroup, ResourceBindGroupDesc, RootSignature, RootSignatureDesc, RootSignatureLayout,
    };
    pub use crate::barrier::{
        BarrierTranslator, BufferBarrierDesc, MemoryBarrierDesc, PipelineBarrierDesc, TextureBarrierDesc,
    };
    pub use crate::device::{BufferResource, Fence, LogicalDevice, Semaphore, TextureResource};
    pub use crate::command_list::{CommandList, CommandListDesc, CommandListPool, CommandListPoolDesc, ExecuteDesc};

    pub mod shader {
        pub use crate::shader::*;
    }

    pub mod binding {
        pub use crate::binding::*;
    }

    pub mod barrier {
        pub use crate::barrier::*;
    }

    pub mod device {
        pub use crate::device::*;
    }

    pub mod command {
        pub use crate::command_list::*;
    }
}
