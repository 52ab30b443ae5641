mod decode_classes;
mod parameter_names;
mod type_annotations;
