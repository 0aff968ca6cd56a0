use mockall::mock;
use rvex_sim::soc::core::{CoreInputs, CoreModel, CoreOutputs};

mock! {
    pub Core {}
    impl CoreModel for Core {
        fn clock(&mut self, inputs: &CoreInputs) -> CoreOutputs;
    }
}
