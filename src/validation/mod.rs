//! 校验模块：按插件样例验证匹配器定义（版本、名称、存在判断与脚本探测）
pub mod fixture;
pub mod validator;

pub use self::fixture::{
    load_fixture_path, load_fixtures_yaml, FieldExample, FieldSample, FixtureEntry, HeaderSample,
    ModularExample, ScriptExample,
};
pub use self::validator::{FixtureKind, FixtureValidator, ValidationFailure, ValidationReport};
