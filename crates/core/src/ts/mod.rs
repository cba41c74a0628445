//! TypeScript syntax tree, rendering and identifier helpers.

mod ast;
mod render;
pub mod utils;

pub use ast::{
    ArrowBody, ImportItem, ObjectEntry, TemplatePart, TsConst, TsExpr, TsFunction, TsImport,
    TsItem, TsLiteral, TsModule, TsParam, TsPrimitive, TsProp, TsStmt, TsType, TsTypeDef,
    TypeDefKind, VarKind,
};
pub use render::Emit;
