use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quasiquote::{quasiquote, quote::quote};
use syn::{Data, DeriveInput, Error, Fields, Index, Member, Type, parse};

/// Splits each field of a `#[repr(C)]` struct into its own vertex buffer.
///
/// The generated impl is on `Vec<Struct>` so a list of instances/vertices can be
/// paired with its buffers through `BufferAndData`. `Buffers` is always a tuple,
/// even for single field structs, so renderers can index it as `buffers.0`.
#[proc_macro_derive(VertexBufferData)]
pub fn vertex_buffer_data(data: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse(data) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error().into(),
    };
    let structname = input.ident.clone();
    let fields = match struct_fields(&input, "Vertex Buffer Data") {
        Ok(fields) => fields,
        Err(err) => return err.into(),
    };

    let buffer_types = fields
        .iter()
        .map(|_| quote!(crate::wgpu_context::WGPUBuffer))
        .collect::<Vec<_>>();

    let create_buffers = fields.iter().map(|(_, type_name)|
        quasiquote!(
            crate::wgpu_context::WGPUBuffer::new_vertex((::std::mem::size_of::<#type_name>() * self.len()) as u64, context)
        )
    ).collect::<Vec<_>>();

    let fill_buffers = fields.iter().enumerate().map(|(i, (member, _))|
        quasiquote!(buffers.#{Index::from(i)}.write_iter(self.iter().map(|x| &x.#member), context))
    ).collect::<Vec<_>>();

    let output = quasiquote!(
        impl crate::wgpu_context::BufferData for ::std::vec::Vec<#structname> {
            type Buffers = (#(#buffer_types,)*);
            fn create_buffers(&self, context: &crate::wgpu_context::WGPUContext) -> Self::Buffers {
                (#(#create_buffers,)*)
            }
            fn fill_buffers(&self, buffers: &mut Self::Buffers, context: &crate::wgpu_context::WGPUContext) {
                #(#fill_buffers;)*
            }
        }
    );
    output.into()
}

/// Uploads the whole struct as one uniform buffer.
#[proc_macro_derive(UniformBufferData)]
pub fn uniform_buffer_data(data: TokenStream) -> TokenStream {
    let input: DeriveInput = match parse(data) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error().into(),
    };
    if let Err(err) = struct_fields(&input, "Uniform Buffer Data") {
        return err.into();
    }
    let structname = input.ident;

    let output = quote!(
        impl crate::wgpu_context::BufferData for #structname {
            type Buffers = crate::wgpu_context::WGPUBuffer;
            fn create_buffers(&self, context: &crate::wgpu_context::WGPUContext) -> Self::Buffers {
                crate::wgpu_context::WGPUBuffer::new_uniform(::std::mem::size_of::<Self>() as u64, context)
            }
            fn fill_buffers(&self, buffers: &mut Self::Buffers, context: &crate::wgpu_context::WGPUContext) {
                buffers.write_data(::bytemuck::bytes_of(self), context);
            }
        }
    );
    output.into()
}

fn struct_fields(input: &DeriveInput, macro_name: &str) -> Result<Vec<(Member, Type)>, TokenStream2> {
    let strct = match &input.data {
        Data::Struct(strct) => strct,
        Data::Enum(x) => {
            return Err(Error::new(x.enum_token.span, format!("{macro_name} cannot be used on enums"))
                .to_compile_error());
        }
        Data::Union(x) => {
            return Err(Error::new(x.union_token.span, format!("{macro_name} cannot be used on unions"))
                .to_compile_error());
        }
    };

    match &strct.fields {
        Fields::Named(named) => Ok(named
            .named
            .iter()
            .filter_map(|field| Some((Member::Named(field.ident.clone()?), field.ty.clone())))
            .collect()),
        Fields::Unnamed(unnamed) => Ok(unnamed
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, field)| (Member::Unnamed(Index::from(i)), field.ty.clone()))
            .collect()),
        Fields::Unit => Err(Error::new(
            strct.struct_token.span,
            format!("{macro_name} cannot be used on unit structs"),
        )
        .to_compile_error()),
    }
}
