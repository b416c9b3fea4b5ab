mod reflector_test;
